//! Query document AST.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Query,
    Mutation,
}

/// A parsed document: one operation and its root selection set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub operation: Operation,
    pub selection: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub arguments: Vec<Argument>,
    /// Empty for scalar leaves.
    pub selection: Vec<Field>,
}

impl Field {
    #[must_use]
    pub fn argument(&self, name: &str) -> Option<&Literal> {
        self.arguments.iter().find(|a| a.name == name).map(|a| &a.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub name: String,
    pub value: Literal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Int(i64),
    Str(String),
}
