//! Static schema and document validation.
//!
//! ```text
//! type Query    { users: [User]  user(id: Int!): User  posts: [Post]  post(id: Int!): Post }
//! type Mutation { createUser(username: String!, email: String!, password: String!): User
//!                 createPost(title: String!, content: String!, authorId: Int!): Post }
//! type User     { id: Int  username: String  email: String  posts: [Post] }
//! type Post     { id: Int  title: String  content: String  authorId: Int  author: User }
//! ```
//!
//! Validation runs before any fetch and reports every problem it finds.

use std::collections::HashSet;
use std::fmt;

use super::ast::{Document, Field, Literal, Operation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Query,
    Mutation,
    User,
    Post,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Scalar(&'static str),
    Object(ObjectType),
    List(ObjectType),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    Int,
    String,
}

pub struct ArgDef {
    pub name: &'static str,
    pub ty: ArgType,
}

pub struct FieldDef {
    pub name: &'static str,
    pub ty: FieldType,
    pub args: &'static [ArgDef],
}

const fn field(name: &'static str, ty: FieldType) -> FieldDef {
    FieldDef { name, ty, args: &[] }
}

const ID_ARG: &[ArgDef] = &[ArgDef { name: "id", ty: ArgType::Int }];

const QUERY_FIELDS: &[FieldDef] = &[
    field("users", FieldType::List(ObjectType::User)),
    FieldDef { name: "user", ty: FieldType::Object(ObjectType::User), args: ID_ARG },
    field("posts", FieldType::List(ObjectType::Post)),
    FieldDef { name: "post", ty: FieldType::Object(ObjectType::Post), args: ID_ARG },
];

const MUTATION_FIELDS: &[FieldDef] = &[
    FieldDef {
        name: "createUser",
        ty: FieldType::Object(ObjectType::User),
        args: &[
            ArgDef { name: "username", ty: ArgType::String },
            ArgDef { name: "email", ty: ArgType::String },
            ArgDef { name: "password", ty: ArgType::String },
        ],
    },
    FieldDef {
        name: "createPost",
        ty: FieldType::Object(ObjectType::Post),
        args: &[
            ArgDef { name: "title", ty: ArgType::String },
            ArgDef { name: "content", ty: ArgType::String },
            ArgDef { name: "authorId", ty: ArgType::Int },
        ],
    },
];

const USER_FIELDS: &[FieldDef] = &[
    field("id", FieldType::Scalar("Int")),
    field("username", FieldType::Scalar("String")),
    field("email", FieldType::Scalar("String")),
    field("posts", FieldType::List(ObjectType::Post)),
];

const POST_FIELDS: &[FieldDef] = &[
    field("id", FieldType::Scalar("Int")),
    field("title", FieldType::Scalar("String")),
    field("content", FieldType::Scalar("String")),
    field("authorId", FieldType::Scalar("Int")),
    field("author", FieldType::Object(ObjectType::User)),
];

impl ObjectType {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Query => "Query",
            Self::Mutation => "Mutation",
            Self::User => "User",
            Self::Post => "Post",
        }
    }

    #[must_use]
    pub fn fields(self) -> &'static [FieldDef] {
        match self {
            Self::Query => QUERY_FIELDS,
            Self::Mutation => MUTATION_FIELDS,
            Self::User => USER_FIELDS,
            Self::Post => POST_FIELDS,
        }
    }

    #[must_use]
    pub fn field(self, name: &str) -> Option<&'static FieldDef> {
        self.fields().iter().find(|f| f.name == name)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(name) => f.write_str(name),
            Self::Object(ty) => f.write_str(ty.name()),
            Self::List(ty) => write!(f, "[{}]", ty.name()),
        }
    }
}

impl ArgType {
    fn name(self) -> &'static str {
        match self {
            Self::Int => "Int!",
            Self::String => "String!",
        }
    }

    fn accepts(self, value: &Literal) -> bool {
        matches!((self, value), (Self::Int, Literal::Int(_)) | (Self::String, Literal::Str(_)))
    }
}

/// Check `document` against the schema.
///
/// # Errors
///
/// Returns every validation message found, in document order.
pub fn validate(document: &Document) -> Result<(), Vec<String>> {
    let root = match document.operation {
        Operation::Query => ObjectType::Query,
        Operation::Mutation => ObjectType::Mutation,
    };
    let mut errors = Vec::new();
    check_selection(root, &document.selection, &mut errors);
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn check_selection(parent: ObjectType, selection: &[Field], errors: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for field in selection {
        if !seen.insert(field.name.as_str()) {
            errors.push(format!("Field \"{}\" is selected more than once on type \"{}\".", field.name, parent.name()));
            continue;
        }
        let Some(def) = parent.field(&field.name) else {
            errors.push(format!("Cannot query field \"{}\" on type \"{}\".", field.name, parent.name()));
            continue;
        };
        check_arguments(parent, def, field, errors);

        match def.ty {
            FieldType::Scalar(_) if !field.selection.is_empty() => errors.push(format!(
                "Field \"{}\" must not have a selection since type \"{}\" has no subfields.",
                field.name, def.ty
            )),
            FieldType::Scalar(_) => {}
            FieldType::Object(child) | FieldType::List(child) => {
                if field.selection.is_empty() {
                    errors.push(format!(
                        "Field \"{}\" of type \"{}\" must have a selection of subfields.",
                        field.name, def.ty
                    ));
                } else {
                    check_selection(child, &field.selection, errors);
                }
            }
        }
    }
}

fn check_arguments(parent: ObjectType, def: &FieldDef, field: &Field, errors: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for arg in &field.arguments {
        if !seen.insert(arg.name.as_str()) {
            errors.push(format!("There can be only one argument named \"{}\".", arg.name));
            continue;
        }
        match def.args.iter().find(|a| a.name == arg.name) {
            None => errors.push(format!(
                "Unknown argument \"{}\" on field \"{}.{}\".",
                arg.name,
                parent.name(),
                def.name
            )),
            Some(expected) if !expected.ty.accepts(&arg.value) => errors.push(format!(
                "Argument \"{}\" on field \"{}.{}\" expects type \"{}\".",
                arg.name,
                parent.name(),
                def.name,
                expected.ty.name()
            )),
            Some(_) => {}
        }
    }
    for expected in def.args {
        if field.argument(expected.name).is_none() {
            errors.push(format!(
                "Field \"{}\" argument \"{}\" of type \"{}\" is required.",
                def.name,
                expected.name,
                expected.ty.name()
            ));
        }
    }
}
