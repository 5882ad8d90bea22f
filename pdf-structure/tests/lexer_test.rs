use pdf_structure::{tokenize, LexicalError, Token};

/// Helper: collect all tokens, panicking on the first lexical error.
fn tokens(input: &[u8]) -> Vec<Token> {
    tokenize(input)
        .collect::<Result<Vec<_>, _>>()
        .expect("input should tokenize")
}

fn single(input: &[u8]) -> Token {
    let toks = tokens(input);
    assert_eq!(toks.len(), 1, "expected one token, got {:?}", toks);
    toks.into_iter().next().unwrap()
}

// --- Literal strings ---

#[test]
fn plain_ascii_string_round_trips() {
    assert_eq!(single(b"(Hello World)"), Token::String(b"Hello World".to_vec()));
}

#[test]
fn empty_string() {
    assert_eq!(single(b"()"), Token::String(Vec::new()));
}

#[test]
fn escape_table_decodes() {
    assert_eq!(
        single(br"(\n\r\t\b\f\(\)\\)"),
        Token::String(vec![10, 13, 9, 8, 12, b'(', b')', b'\\'])
    );
}

#[test]
fn octal_escapes_decode() {
    // \101 = 'A'; \12 = LF; \777 wraps mod 256 to 0xff.
    assert_eq!(
        single(br"(\101\12\777)"),
        Token::String(vec![b'A', 10, 0xff])
    );
}

#[test]
fn short_octal_escape_stops_at_non_digit() {
    assert_eq!(single(br"(\53x)"), Token::String(vec![b'+', b'x']));
}

#[test]
fn line_continuations_collapse() {
    assert_eq!(single(b"(ab\\\ncd)"), Token::String(b"abcd".to_vec()));
    assert_eq!(single(b"(ab\\\r\ncd)"), Token::String(b"abcd".to_vec()));
    assert_eq!(single(b"(ab\\\rcd)"), Token::String(b"abcd".to_vec()));
}

#[test]
fn unknown_escape_emits_byte_without_backslash() {
    assert_eq!(single(br"(\q\z)"), Token::String(b"qz".to_vec()));
}

#[test]
fn nested_parens_balance_before_escapes() {
    // (a(b\)c)\n) decodes to a(b)c) followed by LF.
    assert_eq!(
        single(b"(a(b\\)c)\\n)"),
        Token::String(b"a(b)c)\n".to_vec())
    );
}

#[test]
fn unbalanced_string_is_unterminated() {
    let result: Result<Vec<_>, _> = tokenize(b"(abc").collect();
    assert_eq!(result, Err(LexicalError::UnterminatedString { offset: 0 }));
}

// --- Hex strings ---

#[test]
fn hex_string_decodes() {
    assert_eq!(single(b"<48656C6C6F>"), Token::HexString(b"Hello".to_vec()));
}

#[test]
fn hex_string_ignores_whitespace() {
    assert_eq!(single(b"<48 65\n6C>"), Token::HexString(b"Hel".to_vec()));
}

#[test]
fn odd_hex_digit_count_pads_with_zero() {
    assert_eq!(single(b"<ABC>"), single(b"<ABC0>"));
    assert_eq!(single(b"<ABC>"), Token::HexString(vec![0xab, 0xc0]));
}

#[test]
fn hex_string_rejects_non_hex_byte() {
    let result: Result<Vec<_>, _> = tokenize(b"<4G>").collect();
    assert_eq!(
        result,
        Err(LexicalError::UnexpectedByte {
            byte: b'G',
            offset: 2
        })
    );
}

#[test]
fn unterminated_hex_string() {
    let result: Result<Vec<_>, _> = tokenize(b"<AB").collect();
    assert_eq!(
        result,
        Err(LexicalError::UnterminatedHexString { offset: 0 })
    );
}

// --- Names ---

#[test]
fn name_drops_leading_slash() {
    assert_eq!(single(b"/Type"), Token::Name("Type".to_string()));
}

#[test]
fn name_hex_escape_decodes() {
    assert_eq!(single(b"/A#20B"), Token::Name("A B".to_string()));
}

#[test]
fn name_with_malformed_hash_keeps_byte() {
    assert_eq!(single(b"/A#ZB"), Token::Name("A#ZB".to_string()));
}

#[test]
fn empty_name_is_valid() {
    assert_eq!(single(b"/"), Token::Name(String::new()));
}

// --- Numbers ---

#[test]
fn integer_forms() {
    assert_eq!(single(b"42"), Token::Integer(42));
    assert_eq!(single(b"+1"), Token::Integer(1));
    assert_eq!(single(b"-17"), Token::Integer(-17));
    assert_eq!(single(b"007"), Token::Integer(7));
}

#[test]
fn real_forms() {
    assert_eq!(single(b"2.5"), Token::Real(2.5));
    assert_eq!(single(b"-.5"), Token::Real(-0.5));
    assert_eq!(single(b"4."), Token::Real(4.0));
    assert_eq!(single(b"+1.0"), Token::Real(1.0));
}

#[test]
fn dot_selects_real() {
    // The same digits with and without a dot land on different tags.
    assert_eq!(single(b"123"), Token::Integer(123));
    assert_eq!(single(b"123."), Token::Real(123.0));
}

#[test]
fn oversized_integer_degrades_to_real() {
    match single(b"99999999999999999999999") {
        Token::Real(f) => assert!(f > 9.9e22),
        other => panic!("expected Real, got {:?}", other),
    }
}

// --- Keywords and structure tokens ---

#[test]
fn keyword_tokens() {
    assert_eq!(
        tokens(b"true false null obj endobj R xref trailer"),
        vec![
            Token::Boolean(true),
            Token::Boolean(false),
            Token::Null,
            Token::ObjStart,
            Token::ObjEnd,
            Token::IndirectRefMarker,
            Token::Keyword("xref".to_string()),
            Token::Keyword("trailer".to_string()),
        ]
    );
}

#[test]
fn structure_delimiters() {
    assert_eq!(
        tokens(b"[ ] << >>"),
        vec![
            Token::ArrayStart,
            Token::ArrayEnd,
            Token::DictStart,
            Token::DictEnd,
        ]
    );
}

#[test]
fn unexpected_brace_is_an_error() {
    let result: Result<Vec<_>, _> = tokenize(b"{").collect();
    assert_eq!(
        result,
        Err(LexicalError::UnexpectedByte {
            byte: b'{',
            offset: 0
        })
    );
}

// --- Whitespace and comments ---

#[test]
fn whitespace_collapses() {
    assert_eq!(
        tokens(b"  1 \t\n 2 \x0c\x00 3 "),
        vec![Token::Integer(1), Token::Integer(2), Token::Integer(3)]
    );
}

#[test]
fn comments_run_to_eol() {
    assert_eq!(
        tokens(b"% a comment\n42 % trailing\r\n7"),
        vec![Token::Integer(42), Token::Integer(7)]
    );
}

// --- Header ---

#[test]
fn header_token_comes_first() {
    let toks = tokens(b"%PDF-1.7\n1 0 obj");
    assert_eq!(
        toks,
        vec![
            Token::Header("1.7".to_string()),
            Token::Integer(1),
            Token::Integer(0),
            Token::ObjStart,
        ]
    );
}

#[test]
fn binary_preamble_before_header_is_skipped() {
    let toks = tokens(b"\x00\xffjunk\n%PDF-1.4\n7");
    assert_eq!(
        toks,
        vec![Token::Header("1.4".to_string()), Token::Integer(7)]
    );
}

#[test]
fn headerless_input_tokenizes_as_fragment() {
    assert_eq!(single(b"(just a string)"), Token::String(b"just a string".to_vec()));
}

// --- Streams ---

#[test]
fn stream_payload_by_sentinel_scan() {
    let toks = tokens(b"<< /X 1 >>\nstream\nDATA\nendstream");
    assert_eq!(
        toks,
        vec![
            Token::DictStart,
            Token::Name("X".to_string()),
            Token::Integer(1),
            Token::DictEnd,
            // The exact pre-endstream slice, trailing EOL included.
            Token::Stream(b"DATA\n".to_vec()),
        ]
    );
}

#[test]
fn stream_with_crlf_after_keyword() {
    let toks = tokens(b"<< >>\nstream\r\nabcendstream");
    assert_eq!(*toks.last().unwrap(), Token::Stream(b"abc".to_vec()));
}

#[test]
fn missing_endstream_is_an_error() {
    let result: Result<Vec<_>, _> = tokenize(b"<< >>\nstream\nabc").collect();
    assert!(matches!(
        result,
        Err(LexicalError::MissingEndstream { .. })
    ));
}

// --- Cursor control ---

#[test]
fn set_position_moves_the_cursor() {
    let mut lexer = pdf_structure::Lexer::new(b"1 2 3");
    assert_eq!(lexer.next_token().unwrap(), Token::Integer(1));
    lexer.set_position(4);
    assert_eq!(lexer.next_token().unwrap(), Token::Integer(3));
    assert_eq!(lexer.next_token().unwrap(), Token::Eof);
}

#[test]
fn eof_repeats_at_end() {
    let mut lexer = pdf_structure::Lexer::new(b"");
    assert_eq!(lexer.next_token().unwrap(), Token::Eof);
    assert_eq!(lexer.next_token().unwrap(), Token::Eof);
}
