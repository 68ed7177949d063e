//! The syntax tree produced by the parser.
//!
//! The tree is a single tagged sum; each node exclusively owns its children.
//! The serde impls double as the `--dump-ast` JSON format: every node
//! serializes to an object with a `type` field naming the variant, and
//! operators serialize as their surface spelling.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Mod,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    #[serde(rename = "-")]
    Neg,
    #[serde(rename = "!")]
    Not,
}

/// Compound-assignment tag: `=`, `+=` or `-=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    #[serde(rename = "=")]
    Plain,
    #[serde(rename = "+=")]
    Add,
    #[serde(rename = "-=")]
    Sub,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnKind {
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "void")]
    Void,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Ast {
    #[serde(rename = "Number")]
    Number { value: i32 },

    #[serde(rename = "String")]
    Str { value: String },

    Variable {
        name: String,
    },

    BinaryOp {
        operator: BinOp,
        left: Box<Ast>,
        right: Box<Ast>,
    },

    UnaryOp {
        operator: UnaryOp,
        operand: Box<Ast>,
    },

    /// `target` is restricted to `Variable` or `ArrayAccess`; the code
    /// generator rejects anything else.
    Assignment {
        operator: AssignOp,
        target: Box<Ast>,
        value: Box<Ast>,
    },

    FunctionCall {
        name: String,
        args: Vec<Ast>,
    },

    IfStatement {
        condition: Box<Ast>,
        #[serde(rename = "then")]
        then_branch: Box<Ast>,
        #[serde(rename = "else", skip_serializing_if = "Option::is_none", default)]
        else_branch: Option<Box<Ast>>,
    },

    WhileStatement {
        condition: Box<Ast>,
        body: Box<Ast>,
    },

    ForStatement {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        init: Option<Box<Ast>>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        condition: Option<Box<Ast>>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        update: Option<Box<Ast>>,
        body: Box<Ast>,
    },

    ReturnStatement {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        value: Option<Box<Ast>>,
    },

    Block {
        statements: Vec<Ast>,
    },

    VarDecl {
        name: String,
        is_array: bool,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        size: Option<i32>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        init: Option<Box<Ast>>,
    },

    Function {
        name: String,
        returns: ReturnKind,
        params: Vec<String>,
        body: Box<Ast>,
    },

    Program {
        globals: Vec<Ast>,
        functions: Vec<Ast>,
    },

    ArrayAccess {
        name: String,
        index: Box<Ast>,
    },

    AddressOf {
        name: String,
    },
}
