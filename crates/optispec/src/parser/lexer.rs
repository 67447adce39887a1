use super::{ParseError, Spanned};
use chumsky::prelude::*;
use std::borrow::Cow;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token<'code> {
    BracketRoundOpen,
    BracketRoundClose,
    Number(f64),
    Identifier(&'code str),
    Plus,
    Minus,
    Asterisk,
    Slash,
}

impl<'code> Token<'code> {
    pub fn into_cow_str(self) -> Cow<'code, str> {
        match self {
            Self::BracketRoundOpen => "(".into(),
            Self::BracketRoundClose => ")".into(),
            Self::Number(number) => number.to_string().into(),
            Self::Identifier(identifier) => identifier.into(),
            Self::Plus => "+".into(),
            Self::Minus => "-".into(),
            Self::Asterisk => "*".into(),
            Self::Slash => "/".into(),
        }
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.into_cow_str())
    }
}

pub fn lexer<'code>()
-> impl Parser<'code, &'code str, Vec<Spanned<Token<'code>>>, extra::Err<ParseError<'code, char>>> {
    let bracket = choice((
        just('(').to(Token::BracketRoundOpen),
        just(')').to(Token::BracketRoundClose),
    ));

    let arithmetic_operator = choice((
        just('-').to(Token::Minus),
        just('+').to(Token::Plus),
        just('*').to(Token::Asterisk),
        just('/').to(Token::Slash),
    ));

    // Sign is a prefix operator in the parser, so `-` never belongs to the literal.
    // `5`, `05`, `0.05`, `1.` and `.5` are all literals.
    let number = choice((
        text::digits(10)
            .then(just('.').then(text::digits(10).or_not()).or_not())
            .to_slice(),
        just('.').then(text::digits(10)).to_slice(),
    ))
    .from_str()
    .unwrapped()
    .map(Token::Number);

    // Sanitized field names: `Net_Wt`, `optionType_Length`, `ot_length`, `_tmp2`
    let identifier = any()
        .filter(|character: &char| character.is_alphabetic() || *character == '_')
        .then(
            any()
                .filter(|character: &char| character.is_alphanumeric() || *character == '_')
                .repeated(),
        )
        .to_slice()
        .map(Token::Identifier);

    let token = choice((bracket, number, arithmetic_operator, identifier));

    token
        .map_with(|token, extra| Spanned {
            node: token,
            span: extra.span(),
        })
        .padded_by(text::whitespace())
        .recover_with(skip_then_retry_until(any().ignored(), end()))
        .repeated()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chumsky::prelude::Parser;

    fn tokens(code: &str) -> Vec<Token<'_>> {
        let result = lexer().parse(code);
        result.output().unwrap().iter().map(|t| t.node).collect()
    }

    #[test]
    fn test_arithmetic_tokens() {
        assert_eq!(
            tokens("length * (width + 2.5)"),
            vec![
                Token::Identifier("length"),
                Token::Asterisk,
                Token::BracketRoundOpen,
                Token::Identifier("width"),
                Token::Plus,
                Token::Number(2.5),
                Token::BracketRoundClose,
            ]
        );
    }

    #[test]
    fn test_minus_is_never_part_of_number() {
        assert_eq!(
            tokens("a-1"),
            vec![Token::Identifier("a"), Token::Minus, Token::Number(1.0)]
        );
    }

    #[test]
    fn test_number_literal_forms() {
        assert_eq!(tokens("05"), vec![Token::Number(5.0)]);
        assert_eq!(tokens(".5"), vec![Token::Number(0.5)]);
        assert_eq!(tokens("0.05"), vec![Token::Number(0.05)]);
        assert_eq!(
            tokens("1. * 2"),
            vec![Token::Number(1.0), Token::Asterisk, Token::Number(2.0)]
        );
    }

    #[test]
    fn test_identifier_shapes() {
        assert_eq!(
            tokens("optionType_Net_Wt ot_net_wt _x2"),
            vec![
                Token::Identifier("optionType_Net_Wt"),
                Token::Identifier("ot_net_wt"),
                Token::Identifier("_x2"),
            ]
        );
    }

    #[test]
    fn test_unknown_character_is_reported() {
        let (_, errors) = lexer().parse("1 + 2; 3").into_output_errors();
        assert!(!errors.is_empty());
        assert_eq!(errors[0].span().into_range().start, 5);
    }
}
