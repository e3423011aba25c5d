use nom::bytes::complete::take_till1;
use nom::character::complete::{anychar, multispace0};
use nom::number::complete::double;
use nom::sequence::preceded;
use nom::IResult;

pub(crate) fn consume_string(l: &str) -> IResult<&str, String> {
    preceded(multispace0, take_till1(|c: char| c.is_whitespace()))(l)
        .map(|(rest, s)| (rest, s.to_string()))
}

pub(crate) fn consume_digit(l: &str) -> IResult<&str, u64> {
    preceded(multispace0, nom::character::complete::u64)(l)
}

pub(crate) fn consume_float(l: &str) -> IResult<&str, f64> {
    preceded(multispace0, double)(l)
}

pub(crate) fn consume_char(l: &str) -> IResult<&str, char> {
    preceded(multispace0, anychar)(l)
}

#[cfg(test)]
mod parsing_utils_tests {
    use super::*;

    #[test]
    fn test_consumers_chain() {
        let line = "chr1\t10\t20\tr1\t.\t+";
        let (rest, chrom) = consume_string(line).unwrap();
        let (rest, start) = consume_digit(rest).unwrap();
        let (rest, end) = consume_digit(rest).unwrap();
        let (rest, name) = consume_string(rest).unwrap();
        let (rest, dot) = consume_char(rest).unwrap();
        let (_, strand) = consume_char(rest).unwrap();
        assert_eq!(chrom, "chr1");
        assert_eq!(start, 10);
        assert_eq!(end, 20);
        assert_eq!(name, "r1");
        assert_eq!(dot, '.');
        assert_eq!(strand, '+');
    }

    #[test]
    fn test_consume_float() {
        let (rest, x) = consume_float("  0.25 0.75").unwrap();
        assert_eq!(x, 0.25);
        let (_, y) = consume_float(rest).unwrap();
        assert_eq!(y, 0.75);
    }
}
