//! Binding of decoded method bodies to the model.
//!
//! Every field, method and class operand is looked up through the same
//! arena the source side uses, so a bytecode call into a source-declared
//! type and a source call into a library land on the same [`MethodRef`].

use super::descriptor::{field_descriptor, method_descriptor};
use super::members::{constructors, methods_named};
use crate::builder::bytecode::binary_of;
use crate::builder::synthetic::CONSTRUCTOR;
use crate::model::TypeInfo;
use crate::model::body::{BoundInstruction, BytecodeBody, Symbol};
use crate::program::{OBJECT, Program};
use jinspect_api::models::{DiagnosticKind, FieldRef, MethodRef, TypeId};
use jinspect_bytecode::{ClassFile, LoadableConstant, MemberRef, Operand, decode_code};
use tracing::{trace, warn};

pub(crate) fn bind_body(program: &Program, info: &TypeInfo, class: &ClassFile, index: usize) -> Option<BytecodeBody> {
    let entry = class.methods.get(index)?;
    let data = entry.code.as_ref()?;
    let code = match decode_code(data, &class.constant_pool) {
        Ok(code) => code,
        Err(e) => {
            warn!(class = %info.name, method = %entry.name, error = %e, "undecodable method body");
            program.diagnostics.emit(
                DiagnosticKind::DecodeFailure,
                info.name.clone(),
                format!("cannot decode body of {}.{}{}: {e}", info.name, entry.name, entry.descriptor),
                info.location.clone(),
            );
            return None;
        }
    };
    let binder = Binder {
        program,
        context: format!("{}.{}", info.name, entry.name),
    };
    let instructions: Vec<BoundInstruction> = code
        .instructions
        .into_iter()
        .map(|instruction| {
            let symbol = binder.operand(&instruction.operand);
            BoundInstruction { instruction, symbol }
        })
        .collect();
    trace!(method = %binder.context, count = instructions.len(), "bound bytecode body");
    Some(BytecodeBody {
        max_stack: code.max_stack,
        max_locals: code.max_locals,
        instructions,
        handlers: code.exception_table,
    })
}

struct Binder<'a> {
    program: &'a Program,
    /// `Owner.method`, for diagnostics.
    context: String,
}

impl Binder<'_> {
    fn operand(&self, operand: &Operand) -> Option<Symbol> {
        match operand {
            Operand::Field(r) => Some(self.field(r)),
            Operand::Method(r) => Some(self.method(r)),
            Operand::Type(name) | Operand::MultiANewArray { class: name, .. } => self.class(name),
            Operand::Constant(LoadableConstant::Class(name)) => self.class(name),
            Operand::Constant(LoadableConstant::MethodHandle { target, .. }) => {
                if target.descriptor.starts_with('(') {
                    Some(self.method(target))
                } else {
                    Some(self.field(target))
                }
            }
            _ => None,
        }
    }

    /// Owner of a member reference. Array owners (`[I.clone()`) resolve to
    /// `Object`, which declares every method an array has.
    fn owner(&self, owner: &str) -> Option<TypeId> {
        if owner.starts_with('[') {
            self.program.known_id(OBJECT)
        } else {
            self.program.materialize(&binary_of(owner))
        }
    }

    /// Element class of a class operand; `None` for primitive arrays.
    fn class(&self, name: &str) -> Option<Symbol> {
        let element = name.trim_start_matches('[');
        let internal = if element.len() == name.len() {
            element
        } else {
            element.strip_prefix('L')?.strip_suffix(';')?
        };
        let binary = binary_of(internal);
        Some(match self.program.materialize(&binary) {
            Some(id) => Symbol::Type(id),
            None => self.missing(binary, "class"),
        })
    }

    fn field(&self, r: &MemberRef) -> Symbol {
        let found = self.owner(&r.owner).and_then(|owner| self.find_field(owner, r));
        match found {
            Some(f) => Symbol::Field(f),
            None => self.missing(spelled(r), "field"),
        }
    }

    fn find_field(&self, owner: TypeId, r: &MemberRef) -> Option<FieldRef> {
        let members = self.program.members(owner);
        members.all_fields.iter().copied().find(|f| {
            let named = self
                .program
                .with_field(*f, |_, fi| fi.name == r.name)
                .unwrap_or(false);
            named
                && self
                    .program
                    .field_sig(*f)
                    .is_some_and(|sig| field_descriptor(self.program, &sig.ty) == r.descriptor)
        })
    }

    fn method(&self, r: &MemberRef) -> Symbol {
        let found = self.owner(&r.owner).and_then(|owner| self.find_method(owner, r));
        match found {
            Some(m) => Symbol::Method(m),
            None => self.missing(spelled(r), "method"),
        }
    }

    fn find_method(&self, owner: TypeId, r: &MemberRef) -> Option<MethodRef> {
        let candidates = if r.name == CONSTRUCTOR {
            constructors(self.program, owner)
        } else {
            methods_named(self.program, owner, &r.name)
        };
        if let Some(m) = candidates.iter().copied().find(|m| self.descriptor_of(*m).as_deref() == Some(&r.descriptor)) {
            return Some(m);
        }
        // Source constructors of inner classes omit the outer instance the
        // compiled descriptor carries; a lone source candidate still binds.
        match candidates.as_slice() {
            [only] if self.is_source(*only) => Some(*only),
            _ => None,
        }
    }

    fn descriptor_of(&self, m: MethodRef) -> Option<String> {
        let declared = self.program.with_method(m, |_, mi| mi.descriptor.clone()).flatten();
        declared.or_else(|| {
            self.program
                .method_sig(m)
                .map(|sig| method_descriptor(self.program, &sig))
        })
    }

    fn is_source(&self, m: MethodRef) -> bool {
        self.program
            .with_method(m, |_, mi| mi.descriptor.is_none())
            .unwrap_or(false)
    }

    fn missing(&self, subject: String, what: &str) -> Symbol {
        self.program.diagnostics.emit(
            DiagnosticKind::UnresolvedSymbol,
            subject.clone(),
            format!("{} references missing {what} {subject}", self.context),
            None,
        );
        Symbol::Unresolved(subject)
    }
}

fn spelled(r: &MemberRef) -> String {
    format!("{}.{}{}", binary_of(&r.owner), r.name, r.descriptor)
}

#[cfg(test)]
mod tests {
    use crate::model::{Body, BodyOwner};
    use crate::testing;
    use super::*;

    fn run_body(program: &Program) -> Body {
        let calls = program.materialize("lib.Calls").unwrap();
        let info = program.info(calls).unwrap();
        let index = info.methods.iter().position(|m| m.name == "run").unwrap();
        let body = program.body(BodyOwner::Method(info.method_ref(index))).unwrap();
        (*body).clone()
    }

    #[test]
    fn invocations_bind_to_library_methods() {
        let program = testing::program(&[]);
        let body = run_body(&program);
        let code = body.as_bytecode().unwrap();
        assert_eq!(code.instructions.len(), 5);

        let value_of = code.instructions[1].symbol.as_ref().and_then(Symbol::method).unwrap();
        assert_eq!(program.method_name(value_of), "java.lang.String.valueOf");
        let params = program.method_sig(value_of).unwrap().params;
        assert_eq!(params, vec![program.object()]);

        assert_eq!(code.instructions[0].symbol, None);
        assert_eq!(code.instructions[4].symbol, None);
    }

    #[test]
    fn missing_owners_stay_unresolved_with_one_diagnostic() {
        let program = testing::program(&[]);
        let body = run_body(&program);
        let code = body.as_bytecode().unwrap();
        assert_eq!(
            code.instructions[3].symbol,
            Some(Symbol::Unresolved("lib.Missing.gone()V".to_string()))
        );
        let diagnostics = program.diagnostics.sorted();
        let missing: Vec<_> = diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::UnresolvedSymbol)
            .collect();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].subject, "lib.Missing.gone()V");

        // A second request is served from the cache.
        run_body(&program);
        assert_eq!(program.diagnostics.len(), diagnostics.len());
    }
}
