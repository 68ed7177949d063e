//! x86-64 back-end.
//!
//! Syntax-directed walk over the tree; every expression leaves its 32-bit
//! result in `%eax`. Binary operators evaluate left, push, evaluate right,
//! pop, so they stay correct whatever side effects the subtrees have.
//! Expression temporaries make the stack depth at a call site unknowable in
//! one pass, so calls save `%rsp` in `%rbx` and realign to 16 bytes; `%rbx`
//! is callee-saved and spilled in the prologue.

use crate::{
    ast::{AssignOp, Ast, BinOp, UnaryOp},
    codegen::{
        frame_size,
        symbols::{SymbolClass, SymbolTable},
        Target,
    },
    error::{CompileError, CompileResult},
};

const ARG_REGISTERS: [&str; 6] = ["%rdi", "%rsi", "%rdx", "%rcx", "%r8", "%r9"];
const ARG_REGISTERS_32: [&str; 6] = ["%edi", "%esi", "%edx", "%ecx", "%r8d", "%r9d"];

/// Default frame reservation: 256 bytes of slots plus 8 so the two saved
/// registers keep the frame 16-aligned. Grown in 16-byte steps when the
/// pre-walked frame needs more.
const FRAME_RESERVATION: i32 = 264;

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
                // emitted straight into the data section, so only a
                // literal will do
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
        self.emit_label(&symbol);

        self.emit("pushq %rbx");
        self.emit("pushq %rbp");
        self.emit("movq %rsp, %rbp");
        self.emit(format!("subq ${reservation}, %rsp"));

        for index in 0..params.len() {
            self.emit(format!(
                "movl {}, -{}(%rbp)",
                ARG_REGISTERS_32[index],
                8 * (index + 1)
            ));
        }

        self.gen_statement(body)?;

        // control may fall off the end of the body
        self.gen_epilogue();

        self.symbols.truncate(mark);
        Ok(())
    }

    fn gen_epilogue(&mut self) {
        self.emit("leave");
        self.emit("popq %rbx");
        self.emit("ret");
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
                    self.emit(format!("movl %eax, -{offset}(%rbp)"));
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
                self.emit("cmpl $0, %eax");
                self.emit(format!("je {else_label}"));

                self.gen_statement(then_branch)?;
                self.emit(format!("jmp {end_label}"));

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
                self.emit("cmpl $0, %eax");
                self.emit(format!("je {end_label}"));

                self.gen_statement(body)?;
                self.emit(format!("jmp {start_label}"));
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
                    self.emit("cmpl $0, %eax");
                    self.emit(format!("je {end_label}"));
                }

                self.gen_statement(body)?;
                if let Some(update) = update {
                    self.gen_expression(update)?;
                }
                self.emit(format!("jmp {start_label}"));
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
                self.emit(format!("movl ${value}, %eax"));
                Ok(())
            }
            Ast::Str { value } => {
                let label = self.intern_string(value);
                self.emit(format!("leaq {label}(%rip), %rax"));
                Ok(())
            }
            Ast::Variable { name } => self.gen_variable(name),
            Ast::AddressOf { name } => {
                let (class, _) = self.resolve(name)?;
                match class {
                    SymbolClass::Global => {
                        let symbol = self.decorate(name);
                        self.emit(format!("leaq {symbol}(%rip), %rax"));
                    }
                    SymbolClass::Param { .. } | SymbolClass::Local { .. } => {
                        let offset = self.frame_offset(class);
                        self.emit(format!("leaq -{offset}(%rbp), %rax"));
                    }
                }
                Ok(())
            }
            Ast::ArrayAccess { name, index } => {
                self.gen_expression(index)?;
                self.emit("pushq %rax");
                self.gen_array_base(name, "%rcx")?;
                self.emit("popq %rax");
                self.emit("cltq");
                self.emit("movl (%rcx,%rax,4), %eax");
                Ok(())
            }
            Ast::UnaryOp { operator, operand } => {
                self.gen_expression(operand)?;
                match operator {
                    UnaryOp::Neg => self.emit("negl %eax"),
                    UnaryOp::Not => {
                        self.emit("cmpl $0, %eax");
                        self.emit("sete %al");
                        self.emit("movzbl %al, %eax");
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
                    self.emit(format!("leaq {symbol}(%rip), %rax"));
                } else {
                    self.emit(format!("movl {symbol}(%rip), %eax"));
                }
            }
            SymbolClass::Param { .. } | SymbolClass::Local { .. } => {
                let offset = self.frame_offset(class);
                if is_array {
                    self.emit(format!("leaq -{offset}(%rbp), %rax"));
                } else {
                    self.emit(format!("movl -{offset}(%rbp), %eax"));
                }
            }
        }
        Ok(())
    }

    fn gen_binary(&mut self, operator: BinOp, left: &Ast, right: &Ast) -> CompileResult<()> {
        // logical operators short-circuit: the right operand must not run
        // when the left already decides
        match operator {
            BinOp::And => return self.gen_logical(left, right, "je", 0),
            BinOp::Or => return self.gen_logical(left, right, "jne", 1),
            _ => {}
        }

        self.gen_expression(left)?;
        self.emit("pushq %rax");
        self.gen_expression(right)?;
        self.emit("movl %eax, %ecx");
        self.emit("popq %rax");

        match operator {
            BinOp::Add => self.emit("addl %ecx, %eax"),
            BinOp::Sub => self.emit("subl %ecx, %eax"),
            BinOp::Mul => self.emit("imull %ecx, %eax"),
            BinOp::Div => {
                self.emit("cltd");
                self.emit("idivl %ecx");
            }
            BinOp::Mod => {
                self.emit("cltd");
                self.emit("idivl %ecx");
                self.emit("movl %edx, %eax");
            }
            BinOp::Equal => self.compare("sete"),
            BinOp::NotEqual => self.compare("setne"),
            BinOp::LessThan => self.compare("setl"),
            BinOp::LessOrEqual => self.compare("setle"),
            BinOp::GreaterThan => self.compare("setg"),
            BinOp::GreaterOrEqual => self.compare("setge"),
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
        jump: &str,
        decided: i32,
    ) -> CompileResult<()> {
        let decided_label = self.new_label();
        let end_label = self.new_label();

        self.gen_expression(left)?;
        self.emit("cmpl $0, %eax");
        self.emit(format!("{jump} {decided_label}"));

        self.gen_expression(right)?;
        self.emit("cmpl $0, %eax");
        self.emit(format!("{jump} {decided_label}"));

        self.emit(format!("movl ${}, %eax", 1 - decided));
        self.emit(format!("jmp {end_label}"));
        self.emit_label(&decided_label);
        self.emit(format!("movl ${decided}, %eax"));
        self.emit_label(&end_label);
        Ok(())
    }

    fn compare(&mut self, set: &str) {
        self.emit("cmpl %ecx, %eax");
        self.emit(format!("{set} %al"));
        self.emit("movzbl %al, %eax");
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
                let location = match class {
                    SymbolClass::Global => format!("{}(%rip)", self.decorate(name)),
                    SymbolClass::Param { .. } | SymbolClass::Local { .. } => {
                        format!("-{}(%rbp)", self.frame_offset(class))
                    }
                };

                match operator {
                    AssignOp::Plain => {}
                    AssignOp::Add => self.emit(format!("addl {location}, %eax")),
                    AssignOp::Sub => {
                        self.emit("movl %eax, %ecx");
                        self.emit(format!("movl {location}, %eax"));
                        self.emit("subl %ecx, %eax");
                    }
                }
                self.emit(format!("movl %eax, {location}"));
                Ok(())
            }
            Ast::ArrayAccess { name, index } => {
                self.gen_expression(index)?;
                self.emit("pushq %rax");
                self.gen_expression(value)?;
                self.gen_array_base(name, "%rcx")?;
                self.emit("popq %rdx");
                self.emit("movslq %edx, %rdx");

                match operator {
                    AssignOp::Plain => {}
                    AssignOp::Add => self.emit("addl (%rcx,%rdx,4), %eax"),
                    AssignOp::Sub => {
                        self.emit("movl %eax, %esi");
                        self.emit("movl (%rcx,%rdx,4), %eax");
                        self.emit("subl %esi, %eax");
                    }
                }
                self.emit("movl %eax, (%rcx,%rdx,4)");
                Ok(())
            }
            _ => Err(CompileError::new(
                "assignment target must be a variable or an array element",
            )),
        }
    }

    fn gen_call(&mut self, name: &str, args: &[Ast]) -> CompileResult<()> {
        if args.len() > ARG_REGISTERS.len() {
            return Err(CompileError::new(format!(
                "too many arguments in call to `{name}` (at most {})",
                ARG_REGISTERS.len()
            )));
        }

        // evaluate right to left, then pop left to right
        for arg in args.iter().rev() {
            self.gen_expression(arg)?;
            self.emit("pushq %rax");
        }
        for register in ARG_REGISTERS.iter().take(args.len()) {
            self.emit(format!("popq {register}"));
        }

        let symbol = self.decorate(name);
        self.emit("movq %rsp, %rbx");
        self.emit("andq $-16, %rsp");
        // no vector arguments, should the callee be variadic
        self.emit("movl $0, %eax");
        self.emit(format!("call {symbol}"));
        self.emit("movq %rbx, %rsp");
        Ok(())
    }

    /// Effective address of the named array into `register`.
    fn gen_array_base(&mut self, name: &str, register: &str) -> CompileResult<()> {
        let (class, _) = self.resolve(name)?;
        match class {
            SymbolClass::Global => {
                let symbol = self.decorate(name);
                self.emit(format!("leaq {symbol}(%rip), {register}"));
            }
            SymbolClass::Param { .. } | SymbolClass::Local { .. } => {
                let offset = self.frame_offset(class);
                self.emit(format!("leaq -{offset}(%rbp), {register}"));
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
