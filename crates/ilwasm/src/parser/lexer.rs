//! Tokenizer for IL listings.

use crate::error::CompileError;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Tok {
    /// Names, keywords, directives (`.method`), mnemonics (`ldc.i4.s`) and
    /// single-quoted names.
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Punct(char),
    DoubleColon,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Token {
    pub(super) tok: Tok,
    pub(super) line: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '_' | '.' | '<' | '$' | '@')
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '<' | '>' | '`' | '$' | '@')
}

pub(super) fn tokenize(text: &str) -> Result<Vec<Token>, CompileError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut i = 0;

    let err = |line: usize, message: String| CompileError::Syntax { line, message };

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' => {
                line += 1;
                i += 1;
            }
            c if c.is_whitespace() => i += 1,
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let start = line;
                i += 2;
                loop {
                    match chars.get(i) {
                        None => return Err(err(start, "unterminated comment".into())),
                        Some('*') if chars.get(i + 1) == Some(&'/') => {
                            i += 2;
                            break;
                        }
                        Some('\n') => {
                            line += 1;
                            i += 1;
                        }
                        Some(_) => i += 1,
                    }
                }
            }
            ':' if chars.get(i + 1) == Some(&':') => {
                tokens.push(Token {
                    tok: Tok::DoubleColon,
                    line,
                });
                i += 2;
            }
            '(' | ')' | '[' | ']' | '{' | '}' | ',' | ':' | '=' => {
                tokens.push(Token {
                    tok: Tok::Punct(c),
                    line,
                });
                i += 1;
            }
            '"' => {
                let start = line;
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None | Some('\n') => return Err(err(start, "unterminated string".into())),
                        Some('"') => {
                            i += 1;
                            break;
                        }
                        Some('\\') => {
                            let escaped = match chars.get(i + 1) {
                                Some('n') => '\n',
                                Some('t') => '\t',
                                Some('r') => '\r',
                                Some('0') => '\0',
                                Some('"') => '"',
                                Some('\\') => '\\',
                                other => {
                                    return Err(err(
                                        line,
                                        format!("invalid string escape {:?}", other),
                                    ))
                                }
                            };
                            s.push(escaped);
                            i += 2;
                        }
                        Some(c) => {
                            s.push(*c);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token {
                    tok: Tok::Str(s),
                    line: start,
                });
            }
            '\'' => {
                let start = i + 1;
                let end = chars[start..]
                    .iter()
                    .position(|c| *c == '\'' || *c == '\n')
                    .map(|p| start + p)
                    .filter(|e| chars[*e] == '\'')
                    .ok_or_else(|| err(line, "unterminated quoted name".into()))?;
                tokens.push(Token {
                    tok: Tok::Ident(chars[start..end].iter().collect()),
                    line,
                });
                i = end + 1;
            }
            c if c.is_ascii_digit()
                || (c == '-' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit())) =>
            {
                let start = i;
                i += 1;
                if chars.get(start) == Some(&'0') && matches!(chars.get(i), Some('x') | Some('X'))
                {
                    i += 1;
                    while i < chars.len() && chars[i].is_ascii_hexdigit() {
                        i += 1;
                    }
                    let digits: String = chars[start + 2..i].iter().collect();
                    let v = u64::from_str_radix(&digits, 16)
                        .map_err(|e| err(line, format!("invalid hex literal: {}", e)))?;
                    tokens.push(Token {
                        tok: Tok::Int(v as i64),
                        line,
                    });
                    continue;
                }
                let mut is_float = false;
                while i < chars.len() {
                    let d = chars[i];
                    if d.is_ascii_digit() {
                        i += 1;
                    } else if d == '.' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit()) {
                        is_float = true;
                        i += 1;
                    } else if (d == 'e' || d == 'E') && is_float {
                        i += 1;
                        if matches!(chars.get(i), Some('-') | Some('+')) {
                            i += 1;
                        }
                    } else {
                        break;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let tok = if is_float {
                    Tok::Float(
                        text.parse()
                            .map_err(|e| err(line, format!("invalid float literal: {}", e)))?,
                    )
                } else {
                    Tok::Int(
                        text.parse()
                            .map_err(|e| err(line, format!("invalid integer literal: {}", e)))?,
                    )
                };
                tokens.push(Token { tok, line });
            }
            c if is_ident_start(c) => {
                let start = i;
                i += 1;
                while i < chars.len() && is_ident_continue(chars[i]) {
                    i += 1;
                }
                tokens.push(Token {
                    tok: Tok::Ident(chars[start..i].iter().collect()),
                    line,
                });
            }
            other => return Err(err(line, format!("unexpected character '{}'", other))),
        }
    }
    tokens.push(Token { tok: Tok::Eof, line });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(text: &str) -> Vec<Tok> {
        tokenize(text).unwrap().into_iter().map(|t| t.tok).collect()
    }

    #[test]
    fn instruction_line() {
        assert_eq!(
            toks("IL_000a: ldc.i4.s -5 // five"),
            vec![
                Tok::Ident("IL_000a".into()),
                Tok::Punct(':'),
                Tok::Ident("ldc.i4.s".into()),
                Tok::Int(-5),
                Tok::Eof
            ]
        );
    }

    #[test]
    fn method_reference() {
        assert_eq!(
            toks("void [System.Console]System.Console::WriteLine(int32)"),
            vec![
                Tok::Ident("void".into()),
                Tok::Punct('['),
                Tok::Ident("System.Console".into()),
                Tok::Punct(']'),
                Tok::Ident("System.Console".into()),
                Tok::DoubleColon,
                Tok::Ident("WriteLine".into()),
                Tok::Punct('('),
                Tok::Ident("int32".into()),
                Tok::Punct(')'),
                Tok::Eof
            ]
        );
    }

    #[test]
    fn literals_and_lines() {
        let tokens = tokenize("0x1F\n1.5 \"a\\\"b\"\n'<Main>$'").unwrap();
        assert_eq!(tokens[0].tok, Tok::Int(31));
        assert_eq!(tokens[1].tok, Tok::Float(1.5));
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[2].tok, Tok::Str("a\"b".into()));
        assert_eq!(tokens[3].tok, Tok::Ident("<Main>$".into()));
        assert_eq!(tokens[3].line, 3);
    }

    #[test]
    fn unterminated_string_reports_line() {
        let err = tokenize("\n\n\"abc").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { line: 3, .. }));
    }
}
