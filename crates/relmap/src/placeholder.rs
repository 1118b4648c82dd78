//! Adapter-boundary placeholder rendering.
//!
//! Generated SQL always uses `?`. Engines that want another parameter syntax
//! render the expression here, right before execution; nothing upstream ever
//! sees engine-specific placeholders. Rendering walks the placeholder offsets
//! tracked by [`SqlExpr`], so a literal `?` spliced in as raw text is left
//! alone and bound values keep their order.

use crate::expr::{PLACEHOLDER, SqlExpr};
use std::fmt::Write;

/// Parameter syntax of a database engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderStyle {
    /// `?` (SQLite, MySQL). Rendering is the identity.
    #[default]
    Question,
    /// `$1, $2, ...` (PostgreSQL)
    Dollar,
    /// `:1, :2, ...` (Oracle)
    Colon,
    /// `@p1, @p2, ...` (SQL Server)
    AtP,
}

impl PlaceholderStyle {
    /// Render `expr`'s text with this style's placeholders.
    pub fn render<V>(self, expr: &SqlExpr<V>) -> String {
        let text = expr.text();
        if self == PlaceholderStyle::Question {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len() + expr.placeholder_count() * 3);
        let mut last = 0;
        for (i, &offset) in expr.placeholder_offsets().iter().enumerate() {
            out.push_str(&text[last..offset]);
            self.write_placeholder(&mut out, i + 1);
            last = offset + PLACEHOLDER.len_utf8();
        }
        out.push_str(&text[last..]);
        out
    }

    fn write_placeholder(self, out: &mut String, n: usize) {
        let _ = match self {
            PlaceholderStyle::Question => write!(out, "{PLACEHOLDER}"),
            PlaceholderStyle::Dollar => write!(out, "${n}"),
            PlaceholderStyle::Colon => write!(out, ":{n}"),
            PlaceholderStyle::AtP => write!(out, "@p{n}"),
        };
    }
}
