//! Parameterized SQL expressions.
//!
//! A [`SqlExpr`] is SQL text using `?` as its only placeholder token, plus the
//! values bound to those placeholders in left-to-right order. Expressions nest:
//! interpolating one expression into another splices its text and appends its
//! values at that position, so WHERE clauses, column lists and whole statements
//! compose without anyone renumbering parameters.
//!
//! # Example
//!
//! ```ignore
//! use relmap::{sql, ident, Value};
//!
//! let name: relmap::SqlExpr<Value> = sql!("LOWER({})", "John")?;
//! let q = sql!("SELECT * FROM {} WHERE name = {} AND age = {}", ident("users"), name, 30)?;
//!
//! assert_eq!(q.text(), "SELECT * FROM users WHERE name = LOWER(?) AND age = ?");
//! ```

mod fragment;


pub use fragment::{Fragment, IntoFragment, SqlIdent, SqlUnsafe, bind, ident, unsafe_sql};

use crate::error::{OrmError, OrmResult};
use std::fmt;

/// The positional placeholder token of generated SQL.
pub const PLACEHOLDER: char = '?';

/// An immutable-by-value parameterized SQL fragment.
///
/// The byte offset of every placeholder is tracked alongside the text, which
/// keeps placeholders distinguishable from a literal `?` spliced in through
/// [`Fragment::Unsafe`] (e.g. the Postgres `jsonb ? key` operator) when an
/// adapter renders the expression in its own parameter syntax.
#[derive(Clone, PartialEq)]
#[must_use]
pub struct SqlExpr<V> {
    text: String,
    values: Vec<V>,
    slots: Vec<usize>,
}

impl<V> SqlExpr<V> {
    /// An expression with no text and no values.
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            values: Vec::new(),
            slots: Vec::new(),
        }
    }

    /// A literal expression without parameters.
    ///
    /// Fails if `literal` contains the placeholder character.
    pub fn new(literal: impl Into<String>) -> OrmResult<Self> {
        let literal = literal.into();
        check_literal(&literal)?;
        Ok(Self {
            text: literal,
            values: Vec::new(),
            slots: Vec::new(),
        })
    }

    /// A single placeholder bound to `value`.
    pub fn bind(value: impl Into<V>) -> Self {
        let mut expr = Self::empty();
        expr.push_bind(value);
        expr
    }

    /// Build an expression from literal segments interleaved with items.
    ///
    /// `segments[0] items[0] segments[1] ... items[n-1] segments[n]`, so there
    /// must be exactly one more segment than items. Every segment is checked
    /// for the placeholder character before anything is assembled.
    pub fn from_parts<S: AsRef<str>>(segments: &[S], items: Vec<Fragment<V>>) -> OrmResult<Self> {
        if segments.len() != items.len() + 1 {
            return Err(OrmError::Template(format!(
                "expected {} literal segments for {} items, got {}",
                items.len() + 1,
                items.len(),
                segments.len()
            )));
        }
        for segment in segments {
            check_literal(segment.as_ref())?;
        }

        let mut expr = Self::empty();
        let mut items = items.into_iter();
        for (i, segment) in segments.iter().enumerate() {
            if i > 0 {
                if let Some(item) = items.next() {
                    expr.push_fragment(item);
                }
            }
            expr.push_unsafe(segment.as_ref());
        }
        Ok(expr)
    }

    /// Build an expression from a format-like template with `{}` holes.
    ///
    /// `{{` and `}}` produce literal braces. The number of holes must match
    /// the number of items. This is what [`sql!`](crate::sql!) expands to.
    pub fn template(template: &str, items: Vec<Fragment<V>>) -> OrmResult<Self> {
        let segments = split_template(template)?;
        if segments.len() != items.len() + 1 {
            return Err(OrmError::Template(format!(
                "template has {} holes but {} arguments were given: {template:?}",
                segments.len() - 1,
                items.len()
            )));
        }
        Self::from_parts(&segments, items)
    }

    /// Fold expressions into one, splicing `separator` verbatim between each pair.
    ///
    /// # Errors
    ///
    /// Joining zero expressions has no meaningful result (it would yield e.g.
    /// `WHERE ` or `()`), so an empty input returns [`OrmError::EmptyJoin`].
    /// Callers must handle the empty case themselves.
    pub fn join(exprs: impl IntoIterator<Item = SqlExpr<V>>, separator: &str) -> OrmResult<Self> {
        let mut iter = exprs.into_iter();
        let Some(mut out) = iter.next() else {
            return Err(OrmError::EmptyJoin);
        };
        for expr in iter {
            out.push_unsafe(separator);
            out.push_expr(expr);
        }
        Ok(out)
    }

    /// Append literal SQL text. Fails if it contains the placeholder character.
    pub fn push(&mut self, literal: &str) -> OrmResult<&mut Self> {
        check_literal(literal)?;
        Ok(self.push_unsafe(literal))
    }

    /// Append a placeholder and bind its value.
    pub fn push_bind(&mut self, value: impl Into<V>) -> &mut Self {
        self.slots.push(self.text.len());
        self.text.push(PLACEHOLDER);
        self.values.push(value.into());
        self
    }

    /// Append another expression, consuming it.
    pub fn push_expr(&mut self, other: SqlExpr<V>) -> &mut Self {
        let base = self.text.len();
        self.text.push_str(&other.text);
        self.slots.extend(other.slots.into_iter().map(|slot| slot + base));
        self.values.extend(other.values);
        self
    }

    /// Append a name verbatim.
    pub fn push_ident(&mut self, name: &str) -> &mut Self {
        self.text.push_str(name);
        self
    }

    /// Append raw text verbatim, without checking for placeholders.
    pub fn push_unsafe(&mut self, text: &str) -> &mut Self {
        self.text.push_str(text);
        self
    }

    /// Append any interpolation item.
    pub fn push_fragment(&mut self, fragment: Fragment<V>) -> &mut Self {
        match fragment {
            Fragment::Value(value) => self.push_bind(value),
            Fragment::Expr(expr) => self.push_expr(expr),
            Fragment::Ident(name) => self.push_ident(&name),
            Fragment::Unsafe(text) => self.push_unsafe(&text),
        }
    }

    /// Concatenate two expressions.
    pub fn concat(mut self, other: SqlExpr<V>) -> Self {
        self.push_expr(other);
        self
    }

    /// SQL text with `?` placeholders.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Bound values, in placeholder order.
    pub fn values(&self) -> &[V] {
        &self.values
    }

    /// Byte offsets of the placeholders within [`text`](Self::text).
    pub fn placeholder_offsets(&self) -> &[usize] {
        &self.slots
    }

    pub fn placeholder_count(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.values.is_empty()
    }

    /// Split into text and values.
    pub fn into_parts(self) -> (String, Vec<V>) {
        (self.text, self.values)
    }
}

impl<V> Default for SqlExpr<V> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<V: fmt::Debug> fmt::Debug for SqlExpr<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlExpr")
            .field("text", &self.text)
            .field("values", &self.values)
            .finish()
    }
}

impl<V> fmt::Display for SqlExpr<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn check_literal(literal: &str) -> OrmResult<()> {
    if literal.contains(PLACEHOLDER) {
        return Err(OrmError::PlaceholderInLiteral(literal.to_string()));
    }
    Ok(())
}

fn split_template(template: &str) -> OrmResult<Vec<String>> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = template.chars();

    while let Some(c) = chars.next() {
        match c {
            '{' => match chars.next() {
                Some('}') => segments.push(std::mem::take(&mut current)),
                Some('{') => current.push('{'),
                _ => {
                    return Err(OrmError::Template(format!(
                        "unmatched '{{' in template {template:?}"
                    )));
                }
            },
            '}' => match chars.next() {
                Some('}') => current.push('}'),
                _ => {
                    return Err(OrmError::Template(format!(
                        "unmatched '}}' in template {template:?}"
                    )));
                }
            },
            c => current.push(c),
        }
    }
    segments.push(current);
    Ok(segments)
}

/// Build a [`SqlExpr`] from a template with `{}` holes.
///
/// Each argument goes through [`IntoFragment`]: scalars become bound values,
/// nested expressions are spliced, [`ident`] and [`unsafe_sql`] markers are
/// inserted verbatim. Evaluates to `OrmResult<SqlExpr<V>>`.
///
/// ```ignore
/// let expr: SqlExpr<Value> = sql!("SELECT * FROM t WHERE id = {}", 123)?;
/// assert_eq!(expr.text(), "SELECT * FROM t WHERE id = ?");
/// ```
#[macro_export]
macro_rules! sql {
    ($template:expr $(, $arg:expr)* $(,)?) => {
        $crate::expr::SqlExpr::template(
            $template,
            ::std::vec![$($crate::expr::IntoFragment::into_fragment($arg)),*],
        )
    };
}
