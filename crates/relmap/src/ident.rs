//! SQL identifier validation.
//!
//! Identifiers are spliced into generated SQL verbatim (drivers cannot bind
//! them as parameters), so mapping construction checks every table and column
//! name up front:
//!
//! - unquoted segments match `[A-Za-z_][A-Za-z0-9_$]*`
//! - quoted segments (`"CamelCase"`) allow anything but NUL, with `""` as an
//!   escaped quote
//! - segments are joined with `.` (`schema.table`)

use crate::error::{OrmError, OrmResult};

/// Check that `name` is a plain, dotted or quoted SQL identifier.
pub fn validate_identifier(name: &str) -> OrmResult<()> {
    let invalid = |reason: &str| OrmError::config(format!("invalid identifier {name:?}: {reason}"));

    if name.is_empty() {
        return Err(invalid("empty"));
    }
    if name.contains('\0') {
        return Err(invalid("contains NUL"));
    }

    let mut chars = name.chars().peekable();
    loop {
        match chars.peek() {
            Some('"') => {
                chars.next();
                let mut len = 0;
                loop {
                    match chars.next() {
                        Some('"') if chars.peek() == Some(&'"') => {
                            chars.next();
                            len += 1;
                        }
                        Some('"') => break,
                        Some(_) => len += 1,
                        None => return Err(invalid("unclosed quoted segment")),
                    }
                }
                if len == 0 {
                    return Err(invalid("empty quoted segment"));
                }
            }
            Some(&c) if c == '_' || c.is_ascii_alphabetic() => {
                chars.next();
                while let Some(&c) = chars.peek() {
                    if c == '_' || c == '$' || c.is_ascii_alphanumeric() {
                        chars.next();
                    } else {
                        break;
                    }
                }
            }
            Some(&c) => return Err(invalid(&format!("unexpected character '{c}'"))),
            None => return Err(invalid("empty segment")),
        }

        match chars.next() {
            None => return Ok(()),
            Some('.') => continue,
            Some(c) => return Err(invalid(&format!("unexpected character '{c}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_dotted_and_quoted() {
        for ok in [
            "users",
            "public.users",
            "schema.table.column",
            r#""CamelCase""#,
            r#""has""quote""#,
            r#"public."UserTable".id"#,
            "my_var$1",
        ] {
            assert!(validate_identifier(ok).is_ok(), "{ok}");
        }
    }

    #[test]
    fn rejects_injection_and_malformed_names() {
        for bad in [
            "",
            "1table",
            "my table",
            "schema..table",
            "schema.",
            r#""unclosed"#,
            r#""""#,
            "users; drop table users; --",
            "@auto",
        ] {
            let err = validate_identifier(bad).unwrap_err();
            assert!(err.is_config(), "{bad}");
        }
    }
}
