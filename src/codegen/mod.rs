//! Code generation.
//!
//! Two sibling back-ends translate the syntax tree straight to GNU-syntax
//! assembly text, one pass, no intermediate representation. Which one runs,
//! and which object-file convention it speaks, is decided by the host
//! detected at start-up.

pub mod arm64;
pub mod symbols;
pub mod x86_64;

use crate::{ast::Ast, error::CompileResult};

use symbols::ELEMENT_SIZE;

/// Instruction set and object-file convention selected for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub is_arm64: bool,
    /// ELF section names and undecorated symbols; otherwise Mach-O.
    pub is_linux: bool,
}

impl Target {
    /// Detect the host. There is no runtime override.
    pub fn host() -> Self {
        Self {
            is_arm64: cfg!(target_arch = "aarch64"),
            is_linux: cfg!(target_os = "linux"),
        }
    }
}

/// Translate a `Program` node into assembly text for `target`.
pub fn generate(program: &Ast, target: Target) -> CompileResult<String> {
    if target.is_arm64 {
        arm64::Generator::new(target).generate(program)
    } else {
        x86_64::Generator::new(target).generate(program)
    }
}

/// Frame bytes the parameters and locals of a function will occupy, summed
/// by the same rules [`symbols::SymbolTable::define_local`] applies. Locals
/// never leave the table before function end, so every declaration in the
/// body counts, whatever block it sits in. The prologue reservation must
/// cover this.
pub(crate) fn frame_size(nparams: usize, body: &Ast) -> i32 {
    8 * nparams as i32 + local_size(body)
}

fn local_size(node: &Ast) -> i32 {
    match node {
        Ast::Block { statements } => statements.iter().map(local_size).sum(),
        Ast::VarDecl {
            is_array: true,
            size,
            ..
        } => 8 + ELEMENT_SIZE * (size.unwrap_or(1) - 1),
        Ast::VarDecl { .. } => 8,
        Ast::IfStatement {
            then_branch,
            else_branch,
            ..
        } => {
            local_size(then_branch) + else_branch.as_deref().map(local_size).unwrap_or(0)
        }
        Ast::WhileStatement { body, .. } => local_size(body),
        Ast::ForStatement { init, body, .. } => {
            init.as_deref().map(local_size).unwrap_or(0) + local_size(body)
        }
        _ => 0,
    }
}
