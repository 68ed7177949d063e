//! ARM64 back-end.
//!
//! Sibling of the x86-64 walker: same shape, same conventions, different
//! instruction selection. Every expression leaves its result in `w0`;
//! temporaries are pushed with 16-byte `str x0, [sp, #-16]!` pairs, which
//! keeps the stack aligned at every call site without extra bookkeeping.

use crate::{
    ast::{AssignOp, Ast, BinOp, UnaryOp},
    codegen::{
        frame_size,
        symbols::{SymbolClass, SymbolTable},
        Target,
    },
    error::{CompileError, CompileResult},
};

const MAX_ARGS: usize = 6;

/// Default frame reservation, grown in 16-byte steps when the pre-walked
/// frame needs more.
const FRAME_RESERVATION: i32 = 256;

/// `ldur`/`stur` reach `[x29, #-256]` at most; anything deeper needs its
/// address materialized first.
const UNSCALED_REACH: i32 = 256;

pub struct Generator {
    target: Target,
    out: String,
    symbols: SymbolTable,
    strings: Vec<String>,
    labels: usize,
}

impl Generator {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            out: String::new(),
            symbols: SymbolTable::new(),
            strings: vec![],
            labels: 0,
        }
    }

    pub fn generate(mut self, program: &Ast) -> CompileResult<String> {
        let Ast::Program { globals, functions } = program else {
            unreachable!("code generation starts at the program node");
        };

        self.gen_globals(globals)?;

        if self.target.is_linux {
            self.emit(".text");
        } else {
            self.emit(".section __TEXT,__text,regular,pure_instructions");
        }

        for function in functions {
            self.gen_function(function)?;
        }

        self.gen_strings();

        Ok(self.out)
    }

    fn gen_globals(&mut self, globals: &[Ast]) -> CompileResult<()> {
        if globals.is_empty() {
            return Ok(());
        }

        if self.target.is_linux {
            self.emit(".data");
        } else {
            self.emit(".section __DATA,__data");
        }

        for global in globals {
            let Ast::VarDecl {
                name,
                is_array,
                size,
                init,
            } = global
            else {
                unreachable!("globals are variable declarations");
            };

            let symbol = self.decorate(name);
            self.emit(format!(".globl {symbol}"));
            self.emit(".p2align 2");
            self.emit_label(&symbol);

            if *is_array {
                if init.is_some() {
                    return Err(CompileError::new(format!(
                        "array global `{name}` cannot have an initializer"
                    )));
                }
                let count = size.unwrap_or(1);
                self.emit(format!(".zero {}", 4 * count));
                self.symbols.define_global(name, true, count);
            } else {
                let value = match init.as_deref() {
                    None => 0,
                    Some(Ast::Number { value }) => *value,
                    Some(_) => {
                        return Err(CompileError::new(format!(
                            "initializer of global `{name}` must be an integer literal"
                        )))
                    }
                };
                self.emit(format!(".long {value}"));
                self.symbols.define_global(name, false, 1);
            }
        }

        Ok(())
    }

    fn gen_function(&mut self, function: &Ast) -> CompileResult<()> {
        let Ast::Function {
            name, params, body, ..
        } = function
        else {
            unreachable!("top-level functions are function nodes");
        };

        let mark = self.symbols.mark();
        for (index, param) in params.iter().enumerate() {
            self.symbols.define_param(param, index);
        }
        self.symbols.begin_frame(params.len());

        // the reservation must cover every slot the body will allocate
        let needed = frame_size(params.len(), body);
        let reservation = if needed > FRAME_RESERVATION {
            FRAME_RESERVATION + (needed - FRAME_RESERVATION + 15) / 16 * 16
        } else {
            FRAME_RESERVATION
        };

        let symbol = self.decorate(name);
        self.emit(format!(".globl {symbol}"));
        self.emit(".p2align 2");
        self.emit_label(&symbol);

        self.emit("stp x29, x30, [sp, #-16]!");
        self.emit("mov x29, sp");
        self.sub_sp(reservation);

        for index in 0..params.len() {
            self.store_slot(&format!("w{index}"), 8 * (index as i32 + 1));
        }

        self.gen_statement(body)?;

        // control may fall off the end of the body
        self.gen_epilogue();

        self.symbols.truncate(mark);
        Ok(())
    }

    fn gen_epilogue(&mut self) {
        self.emit("mov sp, x29");
        self.emit("ldp x29, x30, [sp], #16");
        self.emit("ret");
    }

    /// `sub sp, sp, #amount`, split when the immediate outgrows 12 bits.
    fn sub_sp(&mut self, amount: i32) {
        if amount <= 4095 {
            self.emit(format!("sub sp, sp, #{amount}"));
        } else {
            self.emit(format!("sub sp, sp, #{}, lsl #12", amount >> 12));
            self.emit(format!("sub sp, sp, #{}", amount & 0xfff));
        }
    }

    fn gen_statement(&mut self, node: &Ast) -> CompileResult<()> {
        match node {
            Ast::Block { statements } => {
                for statement in statements {
                    self.gen_statement(statement)?;
                }
                Ok(())
            }
            Ast::VarDecl {
                name,
                is_array,
                size,
                init,
            } => {
                let offset = self
                    .symbols
                    .define_local(name, *is_array, size.unwrap_or(1));
                if let Some(init) = init {
                    self.gen_expression(init)?;
                    self.store_slot("w0", offset);
                }
                Ok(())
            }
            Ast::IfStatement {
                condition,
                then_branch,
                else_branch,
            } => {
                let else_label = self.new_label();
                let end_label = self.new_label();

                self.gen_expression(condition)?;
                self.emit("cmp w0, #0");
                self.emit(format!("b.eq {else_label}"));

                self.gen_statement(then_branch)?;
                self.emit(format!("b {end_label}"));

                self.emit_label(&else_label);
                if let Some(else_branch) = else_branch {
                    self.gen_statement(else_branch)?;
                }
                self.emit_label(&end_label);
                Ok(())
            }
            Ast::WhileStatement { condition, body } => {
                let start_label = self.new_label();
                let end_label = self.new_label();

                self.emit_label(&start_label);
                self.gen_expression(condition)?;
                self.emit("cmp w0, #0");
                self.emit(format!("b.eq {end_label}"));

                self.gen_statement(body)?;
                self.emit(format!("b {start_label}"));
                self.emit_label(&end_label);
                Ok(())
            }
            Ast::ForStatement {
                init,
                condition,
                update,
                body,
            } => {
                if let Some(init) = init {
                    self.gen_statement(init)?;
                }

                let start_label = self.new_label();
                let end_label = self.new_label();

                self.emit_label(&start_label);
                if let Some(condition) = condition {
                    self.gen_expression(condition)?;
                    self.emit("cmp w0, #0");
                    self.emit(format!("b.eq {end_label}"));
                }

                self.gen_statement(body)?;
                if let Some(update) = update {
                    self.gen_expression(update)?;
                }
                self.emit(format!("b {start_label}"));
                self.emit_label(&end_label);
                Ok(())
            }
            Ast::ReturnStatement { value } => {
                if let Some(value) = value {
                    self.gen_expression(value)?;
                }
                self.gen_epilogue();
                Ok(())
            }
            _ => self.gen_expression(node),
        }
    }

    fn gen_expression(&mut self, node: &Ast) -> CompileResult<()> {
        match node {
            Ast::Number { value } => {
                self.load_literal("w0", *value);
                Ok(())
            }
            Ast::Str { value } => {
                let label = self.intern_string(value);
                self.load_address(&label, "x0");
                Ok(())
            }
            Ast::Variable { name } => self.gen_variable(name),
            Ast::AddressOf { name } => {
                let (class, _) = self.resolve(name)?;
                match class {
                    SymbolClass::Global => {
                        let symbol = self.decorate(name);
                        self.load_address(&symbol, "x0");
                    }
                    SymbolClass::Param { .. } | SymbolClass::Local { .. } => {
                        let offset = self.frame_offset(class);
                        self.slot_address(offset, "x0");
                    }
                }
                Ok(())
            }
            Ast::ArrayAccess { name, index } => {
                self.gen_expression(index)?;
                self.emit("str x0, [sp, #-16]!");
                self.gen_array_base(name, "x1")?;
                self.emit("ldr x2, [sp], #16");
                self.emit("ldr w0, [x1, w2, sxtw #2]");
                Ok(())
            }
            Ast::UnaryOp { operator, operand } => {
                self.gen_expression(operand)?;
                match operator {
                    UnaryOp::Neg => self.emit("neg w0, w0"),
                    UnaryOp::Not => {
                        self.emit("cmp w0, #0");
                        self.emit("cset w0, eq");
                    }
                }
                Ok(())
            }
            Ast::BinaryOp {
                operator,
                left,
                right,
            } => self.gen_binary(*operator, left, right),
            Ast::Assignment {
                operator,
                target,
                value,
            } => self.gen_assignment(*operator, target, value),
            Ast::FunctionCall { name, args } => self.gen_call(name, args),
            _ => unreachable!("not an expression: {node:?}"),
        }
    }

    fn gen_variable(&mut self, name: &str) -> CompileResult<()> {
        let (class, is_array) = self.resolve(name)?;
        match class {
            SymbolClass::Global => {
                let symbol = self.decorate(name);
                if is_array {
                    self.load_address(&symbol, "x0");
                } else {
                    self.load_address(&symbol, "x1");
                    self.emit("ldr w0, [x1]");
                }
            }
            SymbolClass::Param { .. } | SymbolClass::Local { .. } => {
                let offset = self.frame_offset(class);
                if is_array {
                    self.slot_address(offset, "x0");
                } else {
                    self.load_slot("w0", offset);
                }
            }
        }
        Ok(())
    }

    fn gen_binary(&mut self, operator: BinOp, left: &Ast, right: &Ast) -> CompileResult<()> {
        // logical operators short-circuit: the right operand must not run
        // when the left already decides
        match operator {
            BinOp::And => return self.gen_logical(left, right, "b.eq", 0),
            BinOp::Or => return self.gen_logical(left, right, "b.ne", 1),
            _ => {}
        }

        self.gen_expression(left)?;
        self.emit("str x0, [sp, #-16]!");
        self.gen_expression(right)?;
        self.emit("mov w1, w0");
        self.emit("ldr x0, [sp], #16");

        match operator {
            BinOp::Add => self.emit("add w0, w0, w1"),
            BinOp::Sub => self.emit("sub w0, w0, w1"),
            BinOp::Mul => self.emit("mul w0, w0, w1"),
            BinOp::Div => self.emit("sdiv w0, w0, w1"),
            BinOp::Mod => {
                self.emit("sdiv w2, w0, w1");
                self.emit("msub w0, w2, w1, w0");
            }
            BinOp::Equal => self.compare("eq"),
            BinOp::NotEqual => self.compare("ne"),
            BinOp::LessThan => self.compare("lt"),
            BinOp::LessOrEqual => self.compare("le"),
            BinOp::GreaterThan => self.compare("gt"),
            BinOp::GreaterOrEqual => self.compare("ge"),
            BinOp::And | BinOp::Or => unreachable!("handled above"),
        }
        Ok(())
    }

    /// `&&` / `||`: a branch on the decided value skips the right operand,
    /// then the result is normalized to {0, 1}.
    fn gen_logical(
        &mut self,
        left: &Ast,
        right: &Ast,
        branch: &str,
        decided: i32,
    ) -> CompileResult<()> {
        let decided_label = self.new_label();
        let end_label = self.new_label();

        self.gen_expression(left)?;
        self.emit("cmp w0, #0");
        self.emit(format!("{branch} {decided_label}"));

        self.gen_expression(right)?;
        self.emit("cmp w0, #0");
        self.emit(format!("{branch} {decided_label}"));

        self.emit(format!("mov w0, #{}", 1 - decided));
        self.emit(format!("b {end_label}"));
        self.emit_label(&decided_label);
        self.emit(format!("mov w0, #{decided}"));
        self.emit_label(&end_label);
        Ok(())
    }

    fn compare(&mut self, condition: &str) {
        self.emit("cmp w0, w1");
        self.emit(format!("cset w0, {condition}"));
    }

    fn gen_assignment(
        &mut self,
        operator: AssignOp,
        target: &Ast,
        value: &Ast,
    ) -> CompileResult<()> {
        match target {
            Ast::Variable { name } => {
                self.gen_expression(value)?;

                let (class, _) = self.resolve(name)?;
                match class {
                    SymbolClass::Global => {
                        let symbol = self.decorate(name);
                        self.load_address(&symbol, "x1");
                        match operator {
                            AssignOp::Plain => {}
                            AssignOp::Add => {
                                self.emit("ldr w2, [x1]");
                                self.emit("add w0, w2, w0");
                            }
                            AssignOp::Sub => {
                                self.emit("ldr w2, [x1]");
                                self.emit("sub w0, w2, w0");
                            }
                        }
                        self.emit("str w0, [x1]");
                    }
                    SymbolClass::Param { .. } | SymbolClass::Local { .. } => {
                        let offset = self.frame_offset(class);
                        match operator {
                            AssignOp::Plain => {}
                            AssignOp::Add => {
                                self.load_slot("w1", offset);
                                self.emit("add w0, w1, w0");
                            }
                            AssignOp::Sub => {
                                self.load_slot("w1", offset);
                                self.emit("sub w0, w1, w0");
                            }
                        }
                        self.store_slot("w0", offset);
                    }
                }
                Ok(())
            }
            Ast::ArrayAccess { name, index } => {
                self.gen_expression(index)?;
                self.emit("str x0, [sp, #-16]!");
                self.gen_expression(value)?;
                self.gen_array_base(name, "x1")?;
                self.emit("ldr x2, [sp], #16");

                match operator {
                    AssignOp::Plain => {}
                    AssignOp::Add => {
                        self.emit("ldr w3, [x1, w2, sxtw #2]");
                        self.emit("add w0, w3, w0");
                    }
                    AssignOp::Sub => {
                        self.emit("ldr w3, [x1, w2, sxtw #2]");
                        self.emit("sub w0, w3, w0");
                    }
                }
                self.emit("str w0, [x1, w2, sxtw #2]");
                Ok(())
            }
            _ => Err(CompileError::new(
                "assignment target must be a variable or an array element",
            )),
        }
    }

    fn gen_call(&mut self, name: &str, args: &[Ast]) -> CompileResult<()> {
        if args.len() > MAX_ARGS {
            return Err(CompileError::new(format!(
                "too many arguments in call to `{name}` (at most {MAX_ARGS})"
            )));
        }

        // evaluate right to left, then pop left to right
        for arg in args.iter().rev() {
            self.gen_expression(arg)?;
            self.emit("str x0, [sp, #-16]!");
        }
        for index in 0..args.len() {
            self.emit(format!("ldr x{index}, [sp], #16"));
        }

        let symbol = self.decorate(name);
        self.emit(format!("bl {symbol}"));
        Ok(())
    }

    /// Effective address of the named array into `register`.
    fn gen_array_base(&mut self, name: &str, register: &str) -> CompileResult<()> {
        let (class, _) = self.resolve(name)?;
        match class {
            SymbolClass::Global => {
                let symbol = self.decorate(name);
                self.load_address(&symbol, register);
            }
            SymbolClass::Param { .. } | SymbolClass::Local { .. } => {
                let offset = self.frame_offset(class);
                self.slot_address(offset, register);
            }
        }
        Ok(())
    }

    fn resolve(&self, name: &str) -> CompileResult<(SymbolClass, bool)> {
        let symbol = self
            .symbols
            .lookup(name)
            .ok_or_else(|| CompileError::new(format!("undefined variable `{name}`")))?;
        Ok((symbol.class, symbol.is_array))
    }

    fn frame_offset(&self, class: SymbolClass) -> i32 {
        match class {
            SymbolClass::Param { index } => 8 * (index as i32 + 1),
            SymbolClass::Local { offset } => offset,
            SymbolClass::Global => unreachable!("globals have no frame offset"),
        }
    }

    /// 32-bit immediate into `register`, split into 16-bit halves when it
    /// does not fit a single `mov`.
    fn load_literal(&mut self, register: &str, value: i32) {
        let bits = value as u32;
        if bits < 65536 {
            self.emit(format!("mov {register}, #{bits}"));
        } else {
            self.emit(format!("mov {register}, #{}", bits & 0xffff));
            self.emit(format!("movk {register}, #{}, lsl #16", bits >> 16));
        }
    }

    /// PC-relative address of a named symbol.
    fn load_address(&mut self, symbol: &str, register: &str) {
        if self.target.is_linux {
            self.emit(format!("adrp {register}, {symbol}"));
            self.emit(format!("add {register}, {register}, :lo12:{symbol}"));
        } else {
            self.emit(format!("adrp {register}, {symbol}@PAGE"));
            self.emit(format!("add {register}, {register}, {symbol}@PAGEOFF"));
        }
    }

    /// `register = x29 - offset`.
    fn slot_address(&mut self, offset: i32, register: &str) {
        if offset <= 4095 {
            self.emit(format!("sub {register}, x29, #{offset}"));
        } else {
            self.load_literal("w9", offset);
            self.emit(format!("sub {register}, x29, x9"));
        }
    }

    fn load_slot(&mut self, register: &str, offset: i32) {
        if offset <= UNSCALED_REACH {
            self.emit(format!("ldur {register}, [x29, #-{offset}]"));
        } else {
            self.slot_address(offset, "x9");
            self.emit(format!("ldr {register}, [x9]"));
        }
    }

    fn store_slot(&mut self, register: &str, offset: i32) {
        if offset <= UNSCALED_REACH {
            self.emit(format!("stur {register}, [x29, #-{offset}]"));
        } else {
            self.slot_address(offset, "x9");
            self.emit(format!("str {register}, [x9]"));
        }
    }

    fn gen_strings(&mut self) {
        if self.strings.is_empty() {
            return;
        }

        if self.target.is_linux {
            self.emit(".section .rodata");
        } else {
            self.emit(".section __TEXT,__cstring,cstring_literals");
        }

        for index in 0..self.strings.len() {
            let label = self.string_label(index);
            self.emit_label(&label);
            self.emit(format!(".asciz \"{}\"", self.strings[index]));
        }
    }

    fn intern_string(&mut self, value: &str) -> String {
        let index = match self.strings.iter().position(|existing| existing == value) {
            Some(index) => index,
            None => {
                self.strings.push(value.to_owned());
                self.strings.len() - 1
            }
        };
        self.string_label(index)
    }

    fn string_label(&self, index: usize) -> String {
        if self.target.is_linux {
            format!(".Lstr{index}")
        } else {
            format!("L_str{index}")
        }
    }

    fn new_label(&mut self) -> String {
        let label = if self.target.is_linux {
            format!(".L{}", self.labels)
        } else {
            format!("L{}", self.labels)
        };
        self.labels += 1;
        label
    }

    /// Leading underscore on every externally visible symbol under Mach-O.
    fn decorate(&self, name: &str) -> String {
        if self.target.is_linux {
            name.to_owned()
        } else {
            format!("_{name}")
        }
    }

    fn emit(&mut self, line: impl AsRef<str>) {
        self.out.push('\t');
        self.out.push_str(line.as_ref());
        self.out.push('\n');
    }

    fn emit_label(&mut self, label: &str) {
        self.out.push_str(label);
        self.out.push_str(":\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lexer::Lexer, parser::Parser};

    const ELF: Target = Target {
        is_arm64: true,
        is_linux: true,
    };
    const MACHO: Target = Target {
        is_arm64: true,
        is_linux: false,
    };

    fn gen(input: &str, target: Target) -> CompileResult<String> {
        let program = Parser::new(Lexer::new(input)?).parse()?;
        Generator::new(target).generate(&program)
    }

    #[test]
    fn test_prologue_and_epilogue() {
        let asm = gen("int main() { return 0; }", ELF).unwrap();
        assert!(asm.contains(".globl main"));
        assert!(asm.contains("stp x29, x30, [sp, #-16]!"));
        assert!(asm.contains("mov x29, sp"));
        assert!(asm.contains("sub sp, sp, #256"));
        assert!(asm.contains("mov w0, #0"));
        assert!(asm.contains("mov sp, x29"));
        assert!(asm.contains("ldp x29, x30, [sp], #16"));
    }

    #[test]
    fn test_macho_decoration() {
        let asm = gen("int main() { helper(); return 0; }", MACHO).unwrap();
        assert!(asm.contains(".globl _main"));
        assert!(asm.contains("__TEXT,__text"));
        assert!(asm.contains("bl _helper"));
    }

    #[test]
    fn test_wide_literal_splits_into_halves() {
        let asm = gen("int main() { return 65536; }", ELF).unwrap();
        assert!(asm.contains("mov w0, #0"));
        assert!(asm.contains("movk w0, #1, lsl #16"));
    }

    #[test]
    fn test_small_literal_is_single_mov() {
        let asm = gen("int main() { return 65535; }", ELF).unwrap();
        assert!(asm.contains("mov w0, #65535"));
        assert!(!asm.contains("movk"));
    }

    #[test]
    fn test_parameters_spill_below_frame() {
        let asm = gen("int add(int a, int b) { return a + b; }", ELF).unwrap();
        assert!(asm.contains("stur w0, [x29, #-8]"));
        assert!(asm.contains("stur w1, [x29, #-16]"));
        assert!(asm.contains("ldur w0, [x29, #-8]"));
        assert!(asm.contains("ldur w0, [x29, #-16]"));
    }

    #[test]
    fn test_call_pops_arguments_left_to_right() {
        let asm = gen(
            r#"int main() { printf("%d\n", 7); return 0; }"#,
            ELF,
        )
        .unwrap();
        assert!(asm.contains("str x0, [sp, #-16]!"));
        assert!(asm.contains("ldr x0, [sp], #16"));
        assert!(asm.contains("ldr x1, [sp], #16"));
        assert!(asm.contains("bl printf"));
    }

    #[test]
    fn test_division_and_modulus() {
        let asm = gen("int main() { return 7 / 2 + 7 % 2; }", ELF).unwrap();
        assert!(asm.contains("sdiv w0, w0, w1"));
        assert!(asm.contains("sdiv w2, w0, w1"));
        assert!(asm.contains("msub w0, w2, w1, w0"));
    }

    #[test]
    fn test_comparison_produces_boolean() {
        let asm = gen("int main() { return 1 < 2; }", ELF).unwrap();
        assert!(asm.contains("cmp w0, w1"));
        assert!(asm.contains("cset w0, lt"));
    }

    #[test]
    fn test_globals_use_pc_relative_addressing() {
        let asm = gen("int g = 42; int main() { return g; }", ELF).unwrap();
        assert!(asm.contains(".long 42"));
        assert!(asm.contains("adrp x1, g"));
        assert!(asm.contains("add x1, x1, :lo12:g"));
        assert!(asm.contains("ldr w0, [x1]"));
    }

    #[test]
    fn test_macho_globals_use_page_relocations() {
        let asm = gen("int g; int main() { return g; }", MACHO).unwrap();
        assert!(asm.contains("adrp x1, _g@PAGE"));
        assert!(asm.contains("add x1, x1, _g@PAGEOFF"));
    }

    #[test]
    fn test_array_access_scales_by_four() {
        let asm = gen("int main() { int a[5]; a[2] = 9; return a[2]; }", ELF).unwrap();
        assert!(asm.contains("sub x1, x29, #24"));
        assert!(asm.contains("str w0, [x1, w2, sxtw #2]"));
        assert!(asm.contains("ldr w0, [x1, w2, sxtw #2]"));
    }

    #[test]
    fn test_logical_or_skips_right_operand() {
        let asm = gen("int main() { return f() || g(); }", ELF).unwrap();
        let call_f = asm.find("bl f").unwrap();
        let branch = asm[..asm.find("bl g").unwrap()].rfind("b.ne .L").unwrap();
        assert!(call_f < branch, "left result must branch before the right call");
    }

    #[test]
    fn test_strings_deduplicate_and_land_in_rodata() {
        let asm = gen(
            r#"int main() { puts("x"); puts("x"); return 0; }"#,
            ELF,
        )
        .unwrap();
        assert!(asm.contains(".section .rodata"));
        assert!(asm.contains(".Lstr0:"));
        assert_eq!(asm.matches(".asciz").count(), 1);
    }

    #[test]
    fn test_large_frames_grow_the_reservation() {
        let asm = gen(
            "int main() { int big[64]; big[63] = 1; return big[63]; }",
            ELF,
        )
        .unwrap();
        // 8 + 4*63 = 260 bytes of locals; the 256-byte default grows to 272
        assert!(asm.contains("sub sp, sp, #272"));
        assert!(!asm.contains("sub sp, sp, #256"));
    }

    #[test]
    fn test_huge_frames_split_the_sp_adjustment() {
        let asm = gen("int main() { int big[2000]; return 0; }", ELF).unwrap();
        // 8 + 4*1999 = 8004 bytes of locals, reserved as 8016 = 4096 + 3920
        assert!(asm.contains("sub sp, sp, #1, lsl #12"));
        assert!(asm.contains("sub sp, sp, #3920"));
    }

    #[test]
    fn test_small_frames_keep_the_default_reservation() {
        let asm = gen("int main() { int x = 1; return x; }", ELF).unwrap();
        assert!(asm.contains("sub sp, sp, #256"));
    }

    #[test]
    fn test_undefined_variable_is_an_error() {
        let err = gen("int main() { return nope; }", ELF).unwrap_err();
        assert!(err.message.contains("undefined variable `nope`"));
    }
}
