//! Small typed C emitter.
//!
//! Harness programs are assembled as expression and statement trees and
//! rendered in one pass, so literal values (paths, tags, extents) never
//! pass through a text template.

use std::fmt::{self, Write};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Ident(String),
    Int(u64),
    Bool(bool),
    Str(String),
    Call { func: String, args: Vec<Expr> },
    Member { base: Box<Expr>, field: String },
    Index { base: Box<Expr>, index: Box<Expr> },
    AddrOf(Box<Expr>),
    Cast { ty: String, expr: Box<Expr> },
    Eq(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Ident(name.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    pub fn call(func: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::Call {
            func: func.into(),
            args,
        }
    }

    #[must_use]
    pub fn member(self, field: impl Into<String>) -> Self {
        Self::Member {
            base: Box::new(self),
            field: field.into(),
        }
    }

    #[must_use]
    pub fn index(self, index: Expr) -> Self {
        Self::Index {
            base: Box::new(self),
            index: Box::new(index),
        }
    }

    #[must_use]
    pub fn addr_of(self) -> Self {
        Self::AddrOf(Box::new(self))
    }

    #[must_use]
    pub fn cast(self, ty: impl Into<String>) -> Self {
        Self::Cast {
            ty: ty.into(),
            expr: Box::new(self),
        }
    }

    #[must_use]
    pub fn equals(self, rhs: Expr) -> Self {
        Self::Eq(Box::new(self), Box::new(rhs))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => f.write_str(name),
            Self::Int(value) => write!(f, "{value}"),
            Self::Bool(value) => f.write_str(if *value { "true" } else { "false" }),
            Self::Str(value) => write!(f, "\"{}\"", escape_c_string(value)),
            Self::Call { func, args } => {
                write!(f, "{func}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Self::Member { base, field } => write!(f, "{base}.{field}"),
            Self::Index { base, index } => write!(f, "{base}[{index}]"),
            Self::AddrOf(inner) => write!(f, "&{inner}"),
            Self::Cast { ty, expr } => write!(f, "({ty}) {expr}"),
            Self::Eq(lhs, rhs) => write!(f, "{lhs} == {rhs}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Decl {
        ty: String,
        name: String,
        array_len: Option<Expr>,
        init: Option<Expr>,
    },
    Assert(Expr),
    Assign(Expr, Expr),
    AddAssign(Expr, Expr),
    Expr(Expr),
    DoWhile { body: Vec<Stmt>, cond: Expr },
    Blank,
}

impl Stmt {
    pub fn decl(ty: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Decl {
            ty: ty.into(),
            name: name.into(),
            array_len: None,
            init: None,
        }
    }

    pub fn decl_init(ty: impl Into<String>, name: impl Into<String>, init: Expr) -> Self {
        Self::Decl {
            ty: ty.into(),
            name: name.into(),
            array_len: None,
            init: Some(init),
        }
    }

    pub fn decl_array(ty: impl Into<String>, name: impl Into<String>, len: Expr) -> Self {
        Self::Decl {
            ty: ty.into(),
            name: name.into(),
            array_len: Some(len),
            init: None,
        }
    }

    fn render(&self, out: &mut String, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        match self {
            Self::Decl {
                ty,
                name,
                array_len,
                init,
            } => {
                write!(out, "{indent}{ty} {name}")?;
                if let Some(len) = array_len {
                    write!(out, "[{len}]")?;
                }
                if let Some(init) = init {
                    write!(out, " = {init}")?;
                }
                writeln!(out, ";")
            }
            Self::Assert(cond) => writeln!(out, "{indent}assert({cond});"),
            Self::Assign(lhs, rhs) => writeln!(out, "{indent}{lhs} = {rhs};"),
            Self::AddAssign(lhs, rhs) => writeln!(out, "{indent}{lhs} += {rhs};"),
            Self::Expr(expr) => writeln!(out, "{indent}{expr};"),
            Self::DoWhile { body, cond } => {
                writeln!(out, "{indent}do {{")?;
                for stmt in body {
                    stmt.render(out, depth + 1)?;
                }
                writeln!(out, "{indent}}} while ({cond});")
            }
            Self::Blank => writeln!(out),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Undef(String),
    SystemInclude(String),
    LocalInclude(String),
}

/// A translation unit holding a single `int main(void)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub directives: Vec<Directive>,
    pub main_body: Vec<Stmt>,
}

impl Program {
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) -> fmt::Result {
        for directive in &self.directives {
            match directive {
                Directive::Undef(name) => writeln!(out, "#undef {name}")?,
                Directive::SystemInclude(header) => writeln!(out, "#include <{header}>")?,
                Directive::LocalInclude(header) => {
                    writeln!(out, "#include \"{}\"", escape_c_string(header))?;
                }
            }
        }
        writeln!(out)?;
        writeln!(out, "int main(void) {{")?;
        for stmt in &self.main_body {
            stmt.render(out, 1)?;
        }
        writeln!(out, "}}")
    }
}

/// Escapes `value` for a C string literal. Bytes outside printable ASCII
/// become three-digit octal escapes.
#[must_use]
pub fn escape_c_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'\\' => escaped.push_str("\\\\"),
            b'"' => escaped.push_str("\\\""),
            b'\n' => escaped.push_str("\\n"),
            b'\t' => escaped.push_str("\\t"),
            b'\r' => escaped.push_str("\\r"),
            // `??x` could form a trigraph.
            b'?' => escaped.push_str("\\?"),
            0x20..=0x7e => escaped.push(char::from(byte)),
            _ => {
                let _ = write!(escaped, "\\{byte:03o}");
            }
        }
    }
    escaped
}
