//! Syntax tree for recipe S-expressions.

/// A recipe expression: an atom, a `key="value"` attribute, or a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// An atom - either a symbol or a quoted string.
    /// Examples: `mkdir`, `"src/main/res"`, `implementation`
    Atom(String),

    /// A named attribute inside a list.
    /// Example: `from="App.kt.tmpl"`
    Attr(String, String),

    /// A parenthesized list of expressions.
    /// Example: `(copy "a.png" "res/a.png")`
    List(Vec<Expr>),
}

impl Expr {
    /// Returns the atom value if this is an Atom, None otherwise.
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Expr::Atom(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the list if this is a List, None otherwise.
    pub fn as_list(&self) -> Option<&[Expr]> {
        match self {
            Expr::List(items) => Some(items),
            _ => None,
        }
    }

    /// If this is a list, returns the first element's atom (the instruction name).
    pub fn head(&self) -> Option<&str> {
        self.as_list()?.first()?.as_atom()
    }

    /// If this is a list, returns all elements after the head.
    pub fn tail(&self) -> Option<&[Expr]> {
        let list = self.as_list()?;
        if list.is_empty() { None } else { Some(&list[1..]) }
    }

    /// Looks up a named attribute in this list's tail.
    /// `(copy from="a.png" to="res/a.png")` -> `attr("to") == Some("res/a.png")`
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.tail()?.iter().find_map(|e| match e {
            Expr::Attr(k, v) if k == name => Some(v.as_str()),
            _ => None,
        })
    }

    /// Returns the nth positional (non-attribute) operand of this list's tail.
    pub fn operand(&self, n: usize) -> Option<&str> {
        self.tail()?.iter().filter_map(|e| e.as_atom()).nth(n)
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Atom(s) => {
                if s.contains(' ') || s.contains('"') || s.is_empty() {
                    write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
                } else {
                    write!(f, "{}", s)
                }
            }
            Expr::Attr(k, v) => {
                write!(f, "{}=\"{}\"", k, v.replace('\\', "\\\\").replace('"', "\\\""))
            }
            Expr::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: Vec<Expr>) -> Expr {
        Expr::List(items)
    }

    fn atom(s: &str) -> Expr {
        Expr::Atom(s.into())
    }

    #[test]
    fn test_head_and_tail() {
        let e = list(vec![atom("copy"), atom("a.png"), atom("res/a.png")]);
        assert_eq!(e.head(), Some("copy"));
        assert_eq!(e.tail().unwrap().len(), 2);
    }

    #[test]
    fn test_attr_lookup() {
        let e = list(vec![
            atom("copy"),
            Expr::Attr("from".into(), "a.png".into()),
            Expr::Attr("to".into(), "res/a.png".into()),
        ]);
        assert_eq!(e.attr("from"), Some("a.png"));
        assert_eq!(e.attr("to"), Some("res/a.png"));
        assert_eq!(e.attr("at"), None);
    }

    #[test]
    fn test_operand_skips_attrs() {
        let e = list(vec![
            atom("dependency"),
            atom("implementation"),
            Expr::Attr("min".into(), "1.0".into()),
            atom("g:a:1.0"),
        ]);
        assert_eq!(e.operand(0), Some("implementation"));
        assert_eq!(e.operand(1), Some("g:a:1.0"));
        assert_eq!(e.operand(2), None);
    }

    #[test]
    fn test_display_quotes_when_needed() {
        let e = list(vec![atom("open"), atom("has space.txt")]);
        assert_eq!(e.to_string(), "(open \"has space.txt\")");
    }
}
