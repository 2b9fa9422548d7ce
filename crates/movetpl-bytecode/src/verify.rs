//! Module verification
//!
//! Structural checks only: every index resolves into its target pool,
//! generic structs get as many type arguments as they declare, identifiers
//! are unique and constant values match their types. No type or
//! reference-safety checking is done.

use crate::constants::ConstantError;
use crate::index::IndexKind;
use crate::module::{Module, TableKind, MAGIC, VERSION_MAX, VERSION_MIN};
use crate::opcode::Bytecode;
use crate::signature::SignatureToken;
use std::collections::HashSet;
use thiserror::Error;

/// Largest number of entries an index-addressed table may hold
const TABLE_SIZE_MAX: usize = u16::MAX as usize + 1;

/// Module verification errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// Invalid magic number
    #[error("Invalid magic number {}", hex::encode(.0))]
    InvalidMagic([u8; 4]),

    /// Unsupported version
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u32),

    /// Table with more entries than a 16-bit index can address
    #[error("Table {kind} has {len} entries, more than {TABLE_SIZE_MAX}")]
    TableTooLarge {
        /// The oversized table
        kind: TableKind,
        /// Its element count
        len: usize,
    },

    /// Dangling index
    #[error("{kind} index {index} out of bounds (pool size {len}) in {location}")]
    IndexOutOfBounds {
        /// Pool the index points into
        kind: IndexKind,
        /// The dangling index
        index: usize,
        /// Size of the pool
        len: usize,
        /// Where the index was found
        location: String,
    },

    /// Generic struct applied to the wrong number of type arguments
    #[error("Struct handle {handle} takes {expected} type argument(s), got {actual} in {location}")]
    TypeArgumentCount {
        /// The instantiated struct handle
        handle: usize,
        /// Type parameters the handle declares
        expected: usize,
        /// Type arguments supplied
        actual: usize,
        /// Where the instantiation was found
        location: String,
    },

    /// Identifier that occurs twice in the pool
    #[error("Duplicate identifier {0:?}")]
    DuplicateIdentifier(String),

    /// Constant whose value bytes do not match its type
    #[error("Constant {index} has an invalid value: {source}")]
    ConstantEncoding {
        /// Position in the constant pool
        index: usize,
        /// Why the value was rejected
        #[source]
        source: ConstantError,
    },
}

/// Verify a module's structure
pub fn verify_module(module: &Module) -> Result<(), VerifyError> {
    if module.magic != MAGIC {
        return Err(VerifyError::InvalidMagic(module.magic));
    }
    if !(VERSION_MIN..=VERSION_MAX).contains(&module.version) {
        return Err(VerifyError::UnsupportedVersion(module.version));
    }

    for kind in TableKind::CANONICAL_ORDER {
        let len = module.table_len(kind);
        if len > TABLE_SIZE_MAX {
            return Err(VerifyError::TableTooLarge { kind, len });
        }
    }

    verify_identifiers(module)?;
    verify_constants(module)?;
    BoundsChecker { module }.verify()
}

fn verify_identifiers(module: &Module) -> Result<(), VerifyError> {
    let mut seen = HashSet::with_capacity(module.identifiers.len());
    for ident in &module.identifiers {
        if !seen.insert(ident.as_str()) {
            return Err(VerifyError::DuplicateIdentifier(ident.to_string()));
        }
    }
    Ok(())
}

fn verify_constants(module: &Module) -> Result<(), VerifyError> {
    for (index, constant) in module.constant_pool.iter().enumerate() {
        constant
            .type_tag
            .check_value(&constant.value)
            .map_err(|source| VerifyError::ConstantEncoding { index, source })?;
    }
    Ok(())
}

fn check(
    kind: IndexKind,
    index: usize,
    len: usize,
    location: impl FnOnce() -> String,
) -> Result<(), VerifyError> {
    if index < len {
        Ok(())
    } else {
        Err(VerifyError::IndexOutOfBounds {
            kind,
            index,
            len,
            location: location(),
        })
    }
}

struct BoundsChecker<'a> {
    module: &'a Module,
}

impl BoundsChecker<'_> {
    fn verify(&self) -> Result<(), VerifyError> {
        let m = self.module;
        check(
            IndexKind::ModuleHandle,
            m.self_module_handle_idx.into_index(),
            m.module_handles.len(),
            || "self module handle".to_string(),
        )?;
        self.verify_module_handles()?;
        self.verify_struct_handles()?;
        self.verify_function_handles()?;
        self.verify_signatures()?;
        self.verify_struct_defs()?;
        self.verify_instantiations()?;
        self.verify_field_handles()?;
        self.verify_function_defs()
    }

    fn identifier(&self, index: usize, location: impl FnOnce() -> String) -> Result<(), VerifyError> {
        check(IndexKind::Identifier, index, self.module.identifiers.len(), location)
    }

    fn signature(&self, index: usize, location: impl FnOnce() -> String) -> Result<(), VerifyError> {
        check(IndexKind::Signature, index, self.module.signatures.len(), location)
    }

    fn struct_def(&self, index: usize, location: impl FnOnce() -> String) -> Result<(), VerifyError> {
        check(IndexKind::StructDefinition, index, self.module.struct_defs.len(), location)
    }

    fn verify_module_handles(&self) -> Result<(), VerifyError> {
        let m = self.module;
        let tables = [("module handle", &m.module_handles), ("friend declaration", &m.friend_decls)];
        for (what, handles) in tables {
            for (i, handle) in handles.iter().enumerate() {
                check(
                    IndexKind::AddressIdentifier,
                    handle.address.into_index(),
                    m.address_identifiers.len(),
                    || format!("{what} {i}"),
                )?;
                self.identifier(handle.name.into_index(), || format!("{what} {i}"))?;
            }
        }
        Ok(())
    }

    fn verify_struct_handles(&self) -> Result<(), VerifyError> {
        let m = self.module;
        for (i, handle) in m.struct_handles.iter().enumerate() {
            check(
                IndexKind::ModuleHandle,
                handle.module.into_index(),
                m.module_handles.len(),
                || format!("struct handle {i}"),
            )?;
            self.identifier(handle.name.into_index(), || format!("struct handle {i}"))?;
        }
        Ok(())
    }

    fn verify_function_handles(&self) -> Result<(), VerifyError> {
        let m = self.module;
        for (i, handle) in m.function_handles.iter().enumerate() {
            let location = || format!("function handle {i}");
            check(
                IndexKind::ModuleHandle,
                handle.module.into_index(),
                m.module_handles.len(),
                location,
            )?;
            self.identifier(handle.name.into_index(), location)?;
            self.signature(handle.parameters.into_index(), location)?;
            self.signature(handle.return_.into_index(), location)?;
            let generics = handle.type_parameters.len();
            self.verify_signature_in(handle.parameters.into_index(), generics, location)?;
            self.verify_signature_in(handle.return_.into_index(), generics, location)?;
        }
        Ok(())
    }

    /// Check struct references and instantiation arity in `token`, and,
    /// when the enclosing generic context is known, type parameter indices
    fn verify_token(
        &self,
        token: &SignatureToken,
        type_parameters: Option<usize>,
        location: impl Fn() -> String,
    ) -> Result<(), VerifyError> {
        let m = self.module;
        for nested in token.preorder() {
            match nested {
                SignatureToken::Struct(handle) => {
                    check(
                        IndexKind::StructHandle,
                        handle.into_index(),
                        m.struct_handles.len(),
                        &location,
                    )?;
                }
                SignatureToken::StructInstantiation(handle, args) => {
                    check(
                        IndexKind::StructHandle,
                        handle.into_index(),
                        m.struct_handles.len(),
                        &location,
                    )?;
                    let expected = m.struct_handles[handle.into_index()].type_parameters.len();
                    if args.len() != expected {
                        return Err(VerifyError::TypeArgumentCount {
                            handle: handle.into_index(),
                            expected,
                            actual: args.len(),
                            location: location(),
                        });
                    }
                }
                SignatureToken::TypeParameter(index) => {
                    if let Some(count) = type_parameters {
                        check(IndexKind::TypeParameter, usize::from(*index), count, &location)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn verify_signature_in(
        &self,
        index: usize,
        type_parameters: usize,
        location: impl Fn() -> String,
    ) -> Result<(), VerifyError> {
        for token in &self.module.signatures[index].0 {
            self.verify_token(token, Some(type_parameters), &location)?;
        }
        Ok(())
    }

    fn verify_signatures(&self) -> Result<(), VerifyError> {
        for (i, signature) in self.module.signatures.iter().enumerate() {
            for token in &signature.0 {
                self.verify_token(token, None, || format!("signature {i}"))?;
            }
        }
        Ok(())
    }

    fn verify_struct_defs(&self) -> Result<(), VerifyError> {
        let m = self.module;
        for (i, def) in m.struct_defs.iter().enumerate() {
            check(
                IndexKind::StructHandle,
                def.struct_handle.into_index(),
                m.struct_handles.len(),
                || format!("struct definition {i}"),
            )?;
            let generics = m.struct_handles[def.struct_handle.into_index()]
                .type_parameters
                .len();
            for (f, field) in def.fields().iter().enumerate() {
                let location = || format!("struct definition {i}, field {f}");
                self.identifier(field.name.into_index(), location)?;
                self.verify_token(&field.signature, Some(generics), location)?;
            }
        }
        Ok(())
    }

    fn verify_instantiations(&self) -> Result<(), VerifyError> {
        let m = self.module;
        for (i, inst) in m.struct_def_instantiations.iter().enumerate() {
            let location = || format!("struct instantiation {i}");
            self.struct_def(inst.handle.into_index(), location)?;
            self.signature(inst.type_parameters.into_index(), location)?;
        }
        for (i, inst) in m.function_instantiations.iter().enumerate() {
            let location = || format!("function instantiation {i}");
            check(
                IndexKind::FunctionHandle,
                inst.handle.into_index(),
                m.function_handles.len(),
                location,
            )?;
            self.signature(inst.type_parameters.into_index(), location)?;
        }
        for (i, inst) in m.field_instantiations.iter().enumerate() {
            let location = || format!("field instantiation {i}");
            check(
                IndexKind::FieldHandle,
                inst.handle.into_index(),
                m.field_handles.len(),
                location,
            )?;
            self.signature(inst.type_parameters.into_index(), location)?;
        }
        Ok(())
    }

    fn verify_field_handles(&self) -> Result<(), VerifyError> {
        let m = self.module;
        for (i, handle) in m.field_handles.iter().enumerate() {
            let location = || format!("field handle {i}");
            self.struct_def(handle.owner.into_index(), location)?;
            let owner = &m.struct_defs[handle.owner.into_index()];
            check(
                IndexKind::MemberCount,
                usize::from(handle.field),
                owner.fields().len(),
                location,
            )?;
        }
        Ok(())
    }

    fn verify_function_defs(&self) -> Result<(), VerifyError> {
        let m = self.module;
        for (i, def) in m.function_defs.iter().enumerate() {
            let location = || format!("function definition {i}");
            check(
                IndexKind::FunctionHandle,
                def.function.into_index(),
                m.function_handles.len(),
                location,
            )?;
            for acquired in &def.acquires_global_resources {
                self.struct_def(acquired.into_index(), location)?;
            }
            let Some(unit) = &def.code else {
                continue;
            };
            self.signature(unit.locals.into_index(), location)?;

            let handle = &m.function_handles[def.function.into_index()];
            let generics = handle.type_parameters.len();
            self.verify_signature_in(unit.locals.into_index(), generics, location)?;
            let local_count = m.signatures[handle.parameters.into_index()].len()
                + m.signatures[unit.locals.into_index()].len();
            for (pc, instr) in unit.code.iter().enumerate() {
                self.verify_instruction(instr, unit.code.len(), local_count, generics, || {
                    format!("function definition {i}, instruction {pc}")
                })?;
            }
        }
        Ok(())
    }

    fn verify_instruction(
        &self,
        instr: &Bytecode,
        code_len: usize,
        local_count: usize,
        generics: usize,
        location: impl Fn() -> String,
    ) -> Result<(), VerifyError> {
        use Bytecode as B;
        let m = self.module;
        if let Some(target) = instr.branch_target() {
            return check(IndexKind::CodeOffset, usize::from(target), code_len, location);
        }
        if let Some(local) = instr.local() {
            return check(
                IndexKind::LocalPool,
                usize::from(local),
                local_count,
                location,
            );
        }
        match instr {
            B::LdConst(idx) => check(
                IndexKind::ConstantPool,
                idx.into_index(),
                m.constant_pool.len(),
                location,
            ),
            B::Call(idx) => check(
                IndexKind::FunctionHandle,
                idx.into_index(),
                m.function_handles.len(),
                location,
            ),
            B::CallGeneric(idx) => check(
                IndexKind::FunctionInstantiation,
                idx.into_index(),
                m.function_instantiations.len(),
                location,
            ),
            B::Pack(idx)
            | B::Unpack(idx)
            | B::MutBorrowGlobal(idx)
            | B::ImmBorrowGlobal(idx)
            | B::Exists(idx)
            | B::MoveFrom(idx)
            | B::MoveTo(idx) => self.struct_def(idx.into_index(), location),
            B::PackGeneric(idx)
            | B::UnpackGeneric(idx)
            | B::MutBorrowGlobalGeneric(idx)
            | B::ImmBorrowGlobalGeneric(idx)
            | B::ExistsGeneric(idx)
            | B::MoveFromGeneric(idx)
            | B::MoveToGeneric(idx) => check(
                IndexKind::StructDefInstantiation,
                idx.into_index(),
                m.struct_def_instantiations.len(),
                location,
            ),
            B::MutBorrowField(idx) | B::ImmBorrowField(idx) => check(
                IndexKind::FieldHandle,
                idx.into_index(),
                m.field_handles.len(),
                location,
            ),
            B::MutBorrowFieldGeneric(idx) | B::ImmBorrowFieldGeneric(idx) => check(
                IndexKind::FieldInstantiation,
                idx.into_index(),
                m.field_instantiations.len(),
                location,
            ),
            B::VecPack(sig, _)
            | B::VecUnpack(sig, _)
            | B::VecLen(sig)
            | B::VecImmBorrow(sig)
            | B::VecMutBorrow(sig)
            | B::VecPushBack(sig)
            | B::VecPopBack(sig)
            | B::VecSwap(sig) => {
                self.signature(sig.into_index(), &location)?;
                self.verify_signature_in(sig.into_index(), generics, location)
            }
            _ => Ok(()),
        }
    }
}
