#[cfg(test)]
mod scanner_tests {
    use pretty_assertions::assert_eq;
    use rox as lox;

    use lox::error::ScanError;
    use lox::scanner::*;
    use lox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        let actual: Vec<(TokenType, &str)> = tokens
            .iter()
            .map(|t| (t.token_type, t.lexeme.as_str()))
            .collect();

        assert_eq!(actual, expected);
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_operators_and_ternary() {
        assert_token_sequence(
            "! != = == < <= > >= ? : ;",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::QUESTION_MARK, "?"),
                (TokenType::COLON, ":"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        let (tokens, errors) = Scanner::new("break classy class _x1 nil").scan_tokens();

        assert!(errors.is_empty());
        assert_eq!(tokens[0].token_type, TokenType::BREAK);
        assert_eq!(tokens[1].token_type, TokenType::IDENTIFIER);
        assert_eq!(tokens[1].literal, Some(Literal::Identifier("classy".into())));
        assert_eq!(tokens[2].token_type, TokenType::CLASS);
        assert_eq!(tokens[3].lexeme, "_x1");
        assert_eq!(tokens[4].literal, Some(Literal::Keyword("nil".into())));
    }

    #[test]
    fn test_scanner_04_numbers() {
        let (tokens, _) = Scanner::new("123 45.67 8.").scan_tokens();

        assert_eq!(tokens[0].literal, Some(Literal::Number(123.0)));
        assert_eq!(tokens[1].literal, Some(Literal::Number(45.67)));

        // A trailing dot is its own token.
        assert_eq!(tokens[2].literal, Some(Literal::Number(8.0)));
        assert_eq!(tokens[3].token_type, TokenType::DOT);
        assert_eq!(tokens[4].token_type, TokenType::EOF);
    }

    #[test]
    fn test_scanner_05_multiline_string_advances_line() {
        let (tokens, errors) = Scanner::new("\"a\nb\"\nx").scan_tokens();

        assert!(errors.is_empty());
        assert_eq!(tokens[0].literal, Some(Literal::Str("a\nb".into())));
        assert_eq!(tokens[1].lexeme, "x");
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_scanner_06_unterminated_string() {
        let (tokens, errors) = Scanner::new("var s = \"oops").scan_tokens();

        assert_eq!(errors, vec![ScanError::UnterminatedString { line: 1 }]);
        assert_eq!(tokens.last().map(|t| t.token_type), Some(TokenType::EOF));
    }

    #[test]
    fn test_scanner_07_comments() {
        assert_token_sequence(
            "a // line comment\n/* block /* nested */ still comment */ b",
            &[
                (TokenType::IDENTIFIER, "a"),
                (TokenType::IDENTIFIER, "b"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_08_block_comment_counts_lines() {
        let (tokens, _) = Scanner::new("/*\n\n*/ x").scan_tokens();

        assert_eq!(tokens[0].line, 3);
    }

    #[test]
    fn test_scanner_09_unterminated_block_comment_is_silent() {
        let (tokens, errors) = Scanner::new("x /* never closed").scan_tokens();

        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let results: Vec<_> = Scanner::new(",.$(#").collect();

        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        assert!(matches!(
            results[2],
            Err(ScanError::UnexpectedCharacter { character: '$', line: 1 })
        ));
        assert!(matches!(
            results[4],
            Err(ScanError::UnexpectedCharacter { character: '#', line: 1 })
        ));
    }

    #[test]
    fn test_unexpected_multibyte_character_is_skipped_whole() {
        let (tokens, errors) = Scanner::new("a é b").scan_tokens();

        assert_eq!(
            errors,
            vec![ScanError::UnexpectedCharacter {
                line: 1,
                character: 'é'
            }]
        );
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].lexeme, "b");
    }

    #[test]
    fn test_token_display() {
        let (tokens, _) = Scanner::new("var n = 12;").scan_tokens();

        let lines: Vec<String> = tokens.iter().map(ToString::to_string).collect();

        assert_eq!(
            lines,
            vec![
                "VAR var var",
                "IDENTIFIER n n",
                "EQUAL = null",
                "NUMBER 12 12.0",
                "SEMICOLON ; null",
                "EOF  null",
            ]
        );
    }

    #[test]
    fn test_scanner_is_fused() {
        let mut scanner = Scanner::new("");

        assert!(matches!(scanner.next(), Some(Ok(ref t)) if t.token_type == TokenType::EOF));
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }

    fn assert_token_matches(
        result: &Result<Token, ScanError>,
        expected_type: TokenType,
        expected_lexeme: &str,
    ) {
        match result {
            Ok(token) => {
                assert_eq!(token.token_type, expected_type);
                assert_eq!(token.lexeme, expected_lexeme);
            }
            Err(e) => panic!("Expected token, got error: {}", e),
        }
    }
}
