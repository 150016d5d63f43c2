/// Parsing typed answers from the terminal.
///
/// Accepts a category number, or a scale label (case-insensitive). Anything else is
/// rejected here, so out-of-range values never reach the engine.

/// What the respondent typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Category(u8),
    /// Abandon the session.
    Quit,
}

pub fn parse_answer(input: &str, max_category: u8, labels: &[String]) -> Result<Answer, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(format!("Enter a number from 1 to {max_category}"));
    }
    if trimmed.eq_ignore_ascii_case("q") || trimmed.eq_ignore_ascii_case("quit") {
        return Ok(Answer::Quit);
    }

    if let Ok(n) = trimmed.parse::<u8>() {
        return if (1..=max_category).contains(&n) {
            Ok(Answer::Category(n))
        } else {
            Err(format!("{n} is outside 1..={max_category}"))
        };
    }

    labels
        .iter()
        .position(|l| l.eq_ignore_ascii_case(trimmed))
        .map(|pos| Answer::Category(pos as u8 + 1))
        .ok_or_else(|| format!("\"{trimmed}\" is not a number from 1 to {max_category} or a scale label"))
}

/// Parse `ITEM=CATEGORY` pairs given on the command line.
pub fn parse_response_arg(arg: &str) -> Result<(usize, u8), String> {
    let (item, category) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected ITEM=CATEGORY, got \"{arg}\""))?;
    let item = item
        .trim()
        .parse::<usize>()
        .map_err(|_| format!("invalid item index \"{item}\""))?;
    let category = category
        .trim()
        .parse::<u8>()
        .map_err(|_| format!("invalid category \"{category}\""))?;
    Ok((item, category))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        ["Never", "Rarely", "Sometimes", "Often", "Always"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse_answer("3", 5, &[]), Ok(Answer::Category(3)));
        assert_eq!(parse_answer("  5\n", 5, &[]), Ok(Answer::Category(5)));
        assert!(parse_answer("0", 5, &[]).is_err());
        assert!(parse_answer("6", 5, &[]).is_err());
        assert!(parse_answer("300", 5, &[]).is_err());
    }

    #[test]
    fn test_labels() {
        assert_eq!(parse_answer("often", 5, &labels()), Ok(Answer::Category(4)));
        assert_eq!(parse_answer("NEVER", 5, &labels()), Ok(Answer::Category(1)));
        assert!(parse_answer("maybe", 5, &labels()).is_err());
    }

    #[test]
    fn test_quit_and_empty() {
        assert_eq!(parse_answer("q", 5, &[]), Ok(Answer::Quit));
        assert_eq!(parse_answer("Quit", 5, &[]), Ok(Answer::Quit));
        assert!(parse_answer("", 5, &[]).is_err());
    }

    #[test]
    fn test_response_arg() {
        assert_eq!(parse_response_arg("12=4"), Ok((12, 4)));
        assert_eq!(parse_response_arg(" 3 = 1 "), Ok((3, 1)));
        assert!(parse_response_arg("12").is_err());
        assert!(parse_response_arg("x=4").is_err());
        assert!(parse_response_arg("2=y").is_err());
    }
}
