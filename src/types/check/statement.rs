//! Statement checking.

use std::collections::HashSet;

use crate::ast::{
    AssignStmt, CallStmt, CallTarget, CaseArm, CaseLabels, CaseStmt, CloseFileStmt, Expression,
    ForStmt, GetRecordStmt, IfStmt, InputStmt, OpenFileStmt, OutputStmt, PutRecordStmt,
    ReadFileStmt, RepeatStmt, ReturnStmt, SeekStmt, Statement, SuperCall, SuperStmt, WhileStmt,
    WriteFileStmt,
};
use crate::error::{Diagnostic, Fallible};

use super::super::consteval::ConstValue;
use super::super::ty::Type;
use super::Checker;

/// Key for duplicate-label detection across the arms of one CASE.
fn label_key(value: &ConstValue) -> String {
    match value {
        ConstValue::Integer(v) => format!("i:{v}"),
        ConstValue::Real(v) => format!("r:{v}"),
        ConstValue::Boolean(v) => format!("b:{v}"),
        ConstValue::Char(c) => format!("c:{c}"),
        ConstValue::Str(s) => format!("s:{s}"),
        ConstValue::Date(d) => format!("d:{d}"),
        ConstValue::Enum(name, ordinal) => format!("e:{name}:{ordinal}"),
    }
}

impl Checker {
    pub(crate) fn check_statement(&mut self, stmt: &Statement<()>) -> Fallible<Statement<Type>> {
        match stmt {
            Statement::Assign(assign) => {
                let target = self.check_writable_place(&assign.target)?;
                let value = self.check_expression(&assign.value)?;
                if !self.is_assignable(target.info(), value.info()) {
                    return Err(Diagnostic::type_error(
                        assign.line,
                        format!("Cannot assign {} to {}.", value.info(), target.info()),
                    ));
                }
                Ok(Statement::Assign(AssignStmt {
                    target,
                    value,
                    line: assign.line,
                }))
            }
            Statement::If(s) => {
                let condition = self.require_boolean(&s.condition, "IF condition")?;
                let then_block = self.check_block(&s.then_block)?;
                let else_block = match &s.else_block {
                    Some(block) => Some(self.check_block(block)?),
                    None => None,
                };
                Ok(Statement::If(IfStmt {
                    condition,
                    then_block,
                    else_block,
                    line: s.line,
                }))
            }
            Statement::Case(s) => self.check_case(s),
            Statement::For(s) => self.check_for(s),
            Statement::While(s) => {
                let condition = self.require_boolean(&s.condition, "WHILE condition")?;
                let body = self.check_block(&s.body)?;
                Ok(Statement::While(WhileStmt {
                    condition,
                    body,
                    line: s.line,
                }))
            }
            Statement::Repeat(s) => {
                let body = self.check_block(&s.body)?;
                let condition = self.require_boolean(&s.condition, "UNTIL condition")?;
                Ok(Statement::Repeat(RepeatStmt {
                    body,
                    condition,
                    line: s.line,
                }))
            }
            Statement::Call(s) => self.check_call_statement(s),
            Statement::Return(s) => self.check_return(s),
            Statement::Input(s) => {
                let target = self.check_writable_place(&s.target)?;
                if !target.info().is_inputtable() {
                    return Err(Diagnostic::type_error(
                        s.line,
                        format!("INPUT cannot read a {}.", target.info()),
                    ));
                }
                Ok(Statement::Input(InputStmt {
                    target,
                    line: s.line,
                }))
            }
            Statement::Output(s) => {
                let mut values = Vec::with_capacity(s.values.len());
                for value in &s.values {
                    let typed = self.check_expression(value)?;
                    if !typed.info().is_outputtable() {
                        return Err(Diagnostic::type_error(
                            value.line(),
                            format!("OUTPUT cannot print a {}.", typed.info()),
                        ));
                    }
                    values.push(typed);
                }
                Ok(Statement::Output(OutputStmt {
                    values,
                    line: s.line,
                }))
            }
            Statement::Super(s) => self.check_super_statement(s),
            Statement::OpenFile(s) => {
                let handle = self.check_expression(&s.handle)?;
                if !matches!(handle.info(), Type::TextFile | Type::RandomFile(_)) {
                    return Err(Diagnostic::type_error(
                        s.line,
                        format!("OPENFILE requires a file handle, found {}.", handle.info()),
                    ));
                }
                let path = self.require_string(&s.path, "OPENFILE path")?;
                let mode = self.require_string(&s.mode, "OPENFILE mode")?;
                Ok(Statement::OpenFile(OpenFileStmt {
                    handle,
                    path,
                    mode,
                    line: s.line,
                }))
            }
            Statement::CloseFile(s) => {
                let handle = self.check_expression(&s.handle)?;
                if !matches!(handle.info(), Type::TextFile | Type::RandomFile(_)) {
                    return Err(Diagnostic::type_error(
                        s.line,
                        format!("CLOSEFILE requires a file handle, found {}.", handle.info()),
                    ));
                }
                Ok(Statement::CloseFile(CloseFileStmt {
                    handle,
                    line: s.line,
                }))
            }
            Statement::ReadFile(s) => {
                let handle = self.check_expression(&s.handle)?;
                if handle.info() != &Type::TextFile {
                    return Err(Diagnostic::type_error(
                        s.line,
                        format!("READFILE requires a TEXTFILE, found {}.", handle.info()),
                    ));
                }
                let target = self.check_writable_place(&s.target)?;
                if !target.info().is_inputtable() {
                    return Err(Diagnostic::type_error(
                        s.line,
                        format!("READFILE cannot read a {}.", target.info()),
                    ));
                }
                Ok(Statement::ReadFile(ReadFileStmt {
                    handle,
                    target,
                    line: s.line,
                }))
            }
            Statement::WriteFile(s) => {
                let handle = self.check_expression(&s.handle)?;
                if handle.info() != &Type::TextFile {
                    return Err(Diagnostic::type_error(
                        s.line,
                        format!("WRITEFILE requires a TEXTFILE, found {}.", handle.info()),
                    ));
                }
                let value = self.check_expression(&s.value)?;
                if !value.info().is_outputtable() {
                    return Err(Diagnostic::type_error(
                        s.line,
                        format!("WRITEFILE cannot write a {}.", value.info()),
                    ));
                }
                Ok(Statement::WriteFile(WriteFileStmt {
                    handle,
                    value,
                    line: s.line,
                }))
            }
            Statement::Seek(s) => {
                let handle = self.check_expression(&s.handle)?;
                if !matches!(handle.info(), Type::RandomFile(_)) {
                    return Err(Diagnostic::type_error(
                        s.line,
                        format!("SEEK requires a RANDOMFILE, found {}.", handle.info()),
                    ));
                }
                let position = self.check_expression(&s.position)?;
                if position.info() != &Type::Integer {
                    return Err(Diagnostic::type_error(
                        s.line,
                        format!("SEEK position must be INTEGER, found {}.", position.info()),
                    ));
                }
                Ok(Statement::Seek(SeekStmt {
                    handle,
                    position,
                    line: s.line,
                }))
            }
            Statement::GetRecord(s) => {
                let handle = self.check_expression(&s.handle)?;
                let record = self.random_file_record(handle.info(), s.line, "GETRECORD")?;
                let target = self.check_writable_place(&s.target)?;
                if target.info() != &record {
                    return Err(Diagnostic::type_error(
                        s.line,
                        format!(
                            "GETRECORD target must be {record}, found {}.",
                            target.info()
                        ),
                    ));
                }
                Ok(Statement::GetRecord(GetRecordStmt {
                    handle,
                    target,
                    line: s.line,
                }))
            }
            Statement::PutRecord(s) => {
                let handle = self.check_expression(&s.handle)?;
                let record = self.random_file_record(handle.info(), s.line, "PUTRECORD")?;
                let value = self.check_expression(&s.value)?;
                if value.info() != &record {
                    return Err(Diagnostic::type_error(
                        s.line,
                        format!("PUTRECORD value must be {record}, found {}.", value.info()),
                    ));
                }
                Ok(Statement::PutRecord(PutRecordStmt {
                    handle,
                    value,
                    line: s.line,
                }))
            }
        }
    }

    fn require_boolean(&mut self, expr: &Expression<()>, what: &str) -> Fallible<Expression<Type>> {
        let typed = self.check_expression(expr)?;
        if typed.info() != &Type::Boolean {
            return Err(Diagnostic::type_error(
                expr.line(),
                format!("{what} must be BOOLEAN, found {}.", typed.info()),
            ));
        }
        Ok(typed)
    }

    fn require_string(&mut self, expr: &Expression<()>, what: &str) -> Fallible<Expression<Type>> {
        let typed = self.check_expression(expr)?;
        if typed.info() != &Type::String {
            return Err(Diagnostic::type_error(
                expr.line(),
                format!("{what} must be STRING, found {}.", typed.info()),
            ));
        }
        Ok(typed)
    }

    fn random_file_record(&self, handle: &Type, line: usize, what: &str) -> Fallible<Type> {
        match handle {
            Type::RandomFile(record) => Ok(Type::Record(record.clone())),
            other => Err(Diagnostic::type_error(
                line,
                format!("{what} requires a RANDOMFILE, found {other}."),
            )),
        }
    }

    fn check_case(&mut self, s: &CaseStmt<()>) -> Fallible<Statement<Type>> {
        let scrutinee = self.check_expression(&s.scrutinee)?;
        let subject = scrutinee.info().clone();
        if !matches!(
            subject,
            Type::Integer | Type::Char | Type::Enum(_) | Type::Date
        ) {
            return Err(Diagnostic::type_error(
                s.line,
                format!("CASE subject must be INTEGER, CHAR, DATE, or an enum, found {subject}."),
            ));
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut arms = Vec::with_capacity(s.arms.len());
        for arm in &s.arms {
            let labels = match &arm.labels {
                CaseLabels::Values(values) => {
                    let mut typed = Vec::with_capacity(values.len());
                    for value in values {
                        let folded = self.fold_case_label(value, &subject)?;
                        if !seen.insert(label_key(&folded)) {
                            return Err(Diagnostic::syntax(
                                value.line(),
                                "Duplicate CASE label.",
                            ));
                        }
                        typed.push(self.check_expression(value)?);
                    }
                    CaseLabels::Values(typed)
                }
                CaseLabels::Range(low, high) => {
                    self.fold_case_label(low, &subject)?;
                    self.fold_case_label(high, &subject)?;
                    CaseLabels::Range(self.check_expression(low)?, self.check_expression(high)?)
                }
            };
            let body = self.check_block(&arm.body)?;
            arms.push(CaseArm {
                labels,
                body,
                line: arm.line,
            });
        }
        let otherwise = match &s.otherwise {
            Some(block) => Some(self.check_block(block)?),
            None => None,
        };
        Ok(Statement::Case(CaseStmt {
            scrutinee,
            arms,
            otherwise,
            line: s.line,
        }))
    }

    fn fold_case_label(&mut self, expr: &Expression<()>, subject: &Type) -> Fallible<ConstValue> {
        let folded = self.fold_constant(expr)?;
        if &folded.ty() != subject {
            return Err(Diagnostic::type_error(
                expr.line(),
                format!("CASE label type {} does not match subject {subject}.", folded.ty()),
            ));
        }
        Ok(folded)
    }

    fn check_for(&mut self, s: &ForStmt<()>) -> Fallible<Statement<Type>> {
        if s.next_name != s.counter {
            return Err(Diagnostic::syntax(
                s.line,
                format!(
                    "NEXT names '{}' but the loop counter is '{}'.",
                    s.next_name, s.counter
                ),
            ));
        }
        let start = self.require_integer(&s.start, "FOR start")?;
        let end = self.require_integer(&s.end, "FOR end")?;
        let step = match &s.step {
            Some(step) => Some(self.require_integer(step, "FOR step")?),
            None => None,
        };

        // A counter already in scope must be an unlocked INTEGER
        // variable; otherwise the loop implicitly declares one.
        let existing = match self.resolve_value_name(&s.counter, s.line) {
            Ok(super::expression::Resolved::Var { ty, locked }) => {
                if ty != Type::Integer {
                    return Err(Diagnostic::type_error(
                        s.line,
                        format!("FOR counter '{}' must be INTEGER, found {ty}.", s.counter),
                    ));
                }
                if locked {
                    return Err(Diagnostic::access(
                        s.line,
                        format!("Cannot assign to loop counter '{}'.", s.counter),
                    ));
                }
                true
            }
            Ok(_) => {
                return Err(Diagnostic::type_error(
                    s.line,
                    format!("FOR counter '{}' must be an INTEGER variable.", s.counter),
                ));
            }
            Err(_) => false,
        };

        let body = if existing {
            self.lock_counter(&s.counter, true);
            let body = self.check_block(&s.body);
            self.lock_counter(&s.counter, false);
            body?
        } else {
            self.enter_scope();
            let result = self
                .define_var(&s.counter, Type::Integer, true, s.line)
                .and_then(|_| self.check_block(&s.body));
            self.leave_scope();
            result?
        };

        Ok(Statement::For(ForStmt {
            counter: s.counter.clone(),
            start,
            end,
            step,
            body,
            next_name: s.next_name.clone(),
            line: s.line,
        }))
    }

    fn require_integer(&mut self, expr: &Expression<()>, what: &str) -> Fallible<Expression<Type>> {
        let typed = self.check_expression(expr)?;
        if typed.info() != &Type::Integer {
            return Err(Diagnostic::type_error(
                expr.line(),
                format!("{what} must be INTEGER, found {}.", typed.info()),
            ));
        }
        Ok(typed)
    }

    fn check_return(&mut self, s: &ReturnStmt<()>) -> Fallible<Statement<Type>> {
        let context = match self.routine_returns() {
            Some(context) => context.clone(),
            None => {
                return Err(Diagnostic::syntax(
                    s.line,
                    "RETURN outside a procedure or function.",
                ));
            }
        };
        let value = match (&s.value, &context) {
            (Some(expr), Some(expected)) => {
                let typed = self.check_expression(expr)?;
                if !self.is_assignable(expected, typed.info()) {
                    return Err(Diagnostic::type_error(
                        s.line,
                        format!("RETURN value must be {expected}, found {}.", typed.info()),
                    ));
                }
                Some(typed)
            }
            (None, Some(expected)) => {
                return Err(Diagnostic::type_error(
                    s.line,
                    format!("Function must RETURN a {expected} value."),
                ));
            }
            (Some(_), None) => {
                return Err(Diagnostic::type_error(
                    s.line,
                    "A procedure cannot RETURN a value.",
                ));
            }
            (None, None) => None,
        };
        Ok(Statement::Return(ReturnStmt {
            value,
            line: s.line,
        }))
    }

    fn check_call_statement(&mut self, s: &CallStmt<()>) -> Fallible<Statement<Type>> {
        let line = s.line;
        match &s.target {
            CallTarget::Name(name) => {
                let signature = self.lookup_procedure(name, line)?;
                let args = self.check_args(&signature, &s.args, line, name)?;
                Ok(Statement::Call(CallStmt {
                    target: CallTarget::Name(name.clone()),
                    args,
                    line,
                }))
            }
            CallTarget::Method { object, method } => {
                let object = self.check_expression(object)?;
                let class = match object.info() {
                    Type::Class(name) => name.clone(),
                    other => {
                        return Err(Diagnostic::type_error(
                            line,
                            format!("{other} has no methods."),
                        ));
                    }
                };
                let (owner, info) = self
                    .classes()
                    .find_method(&class, method)
                    .map(|(o, m)| (o.name.clone(), m.clone()))
                    .ok_or_else(|| {
                        Diagnostic::name(
                            line,
                            format!("Class '{class}' has no method '{method}'."),
                        )
                    })?;
                if !self.access_allowed(info.access, &owner) {
                    return Err(Diagnostic::access(
                        line,
                        format!("Method '{method}' is private to class '{owner}'."),
                    ));
                }
                if info.is_function {
                    return Err(Diagnostic::type_error(
                        line,
                        format!("CALL cannot invoke function '{method}'."),
                    ));
                }
                let args = self.check_args(&info.signature, &s.args, line, method)?;
                Ok(Statement::Call(CallStmt {
                    target: CallTarget::Method {
                        object,
                        method: method.clone(),
                    },
                    args,
                    line,
                }))
            }
            CallTarget::SuperMethod(method) => {
                let probe = SuperCall {
                    method: method.clone(),
                    args: s.args.clone(),
                    line,
                    info: (),
                };
                let typed = self.check_super_call(&probe, false)?;
                let args = match typed {
                    Expression::SuperCall(call) => call.args,
                    _ => unreachable!("check_super_call returns a SuperCall"),
                };
                Ok(Statement::Call(CallStmt {
                    target: CallTarget::SuperMethod(method.clone()),
                    args,
                    line,
                }))
            }
        }
    }

    /// Resolve a `CALL` target name to a procedure signature.
    fn lookup_procedure(
        &mut self,
        name: &str,
        line: usize,
    ) -> Fallible<super::super::symbols::Signature> {
        use super::super::symbols::Symbol;
        if let Some(symbol) = self.scopes_ref().lookup_above(name, self.floor()) {
            return match symbol {
                Symbol::Proc(sig) => Ok(sig.clone()),
                Symbol::Func(_) => Err(Diagnostic::type_error(
                    line,
                    format!("CALL cannot invoke function '{name}'."),
                )),
                other => Err(Diagnostic::type_error(
                    line,
                    format!("'{name}' is {}; it cannot be called.", other.describe()),
                )),
            };
        }
        if let Some(class) = self.current_class().map(str::to_string) {
            if let Some((owner, method)) = self
                .classes()
                .find_method(&class, name)
                .map(|(o, m)| (o.name.clone(), m.clone()))
            {
                if !self.access_allowed(method.access, &owner) {
                    return Err(Diagnostic::access(
                        line,
                        format!("Method '{name}' is private to class '{owner}'."),
                    ));
                }
                if method.is_function {
                    return Err(Diagnostic::type_error(
                        line,
                        format!("CALL cannot invoke function '{name}'."),
                    ));
                }
                return Ok(method.signature);
            }
        }
        if self.floor() > 0 {
            if let Some(symbol) = self.scopes_ref().lookup_global(name) {
                return match symbol {
                    Symbol::Proc(sig) => Ok(sig.clone()),
                    Symbol::Func(_) => Err(Diagnostic::type_error(
                        line,
                        format!("CALL cannot invoke function '{name}'."),
                    )),
                    other => Err(Diagnostic::type_error(
                        line,
                        format!("'{name}' is {}; it cannot be called.", other.describe()),
                    )),
                };
            }
        }
        Err(Diagnostic::name(
            line,
            format!("Undeclared procedure '{name}'."),
        ))
    }

    fn check_super_statement(&mut self, s: &SuperStmt<()>) -> Fallible<Statement<Type>> {
        let line = s.line;
        if !self.in_constructor() {
            return Err(Diagnostic::syntax(
                line,
                "SUPER(...) is only valid inside a constructor.",
            ));
        }
        let class = self
            .current_class()
            .expect("constructors are class members")
            .to_string();
        let base = self
            .classes()
            .get(&class)
            .and_then(|info| info.base.clone())
            .ok_or_else(|| {
                Diagnostic::type_error(line, format!("Class '{class}' has no base class."))
            })?;
        let constructor = self.classes().get(&base).and_then(|info| info.constructor.clone());
        let args = match constructor {
            Some(signature) => {
                self.check_args(&signature, &s.args, line, &format!("constructor of '{base}'"))?
            }
            None => {
                if !s.args.is_empty() {
                    return Err(Diagnostic::type_error(
                        line,
                        format!("Class '{base}' has no constructor."),
                    ));
                }
                Vec::new()
            }
        };
        Ok(Statement::Super(SuperStmt { args, line }))
    }
}
