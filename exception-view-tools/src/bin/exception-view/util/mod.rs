pub mod logging;

use std::num::ParseIntError;

pub fn parse_u32(input: &str) -> Result<u32, ParseIntError> {
    parse_int::parse(input)
}

/// Print the rows of a view, either one per line or as a JSON array of records.
pub fn print_rows<T: serde::Serialize>(
    rows: &[T],
    json: bool,
    text: impl Fn(&T) -> &str,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rows)?);
    } else {
        for row in rows {
            println!("{}", text(row));
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::parse_u32;
    use test_case::test_case;

    #[test_case("0xE000ED04", 0xE000_ED04)]
    #[test_case("0b101", 5)]
    #[test_case("4096", 4096)]
    #[test_case("1_000", 1000)]
    fn numbers_in_any_base(input: &str, expected: u32) {
        assert_eq!(parse_u32(input).unwrap(), expected);
    }

    #[test]
    fn out_of_range() {
        assert!(parse_u32("0x1_0000_0000").is_err());
    }
}
