//! Declaration table: every type in a compilation unit with its storage
//! members, methods and constructors, keyed by case-folded name.

use std::collections::HashMap;

use crate::ast::{
    AccessorKind, CompilationUnit, FieldDecl, Item, Member, MethodDecl, MethodKind,
    ParameterDecl, PassingMode, PropertyDecl, TypeDecl, TypeDeclKind, TypeRef,
};

use super::{
    ContainerKind, MethodSignature, Parameter, ParameterModality, StorageKind, StorageSymbol,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct StorageId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct MethodId(pub usize);

/// A field or property slot of a type.
#[derive(Debug, Clone)]
pub(crate) struct StorageEntry {
    pub id: StorageId,
    /// Case-folded name of the declared type, `None` for arrays and untyped members.
    pub ty: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct MethodEntry {
    pub id: MethodId,
    pub return_type: Option<String>,
    /// Parameters that are neither `Optional` nor `ParamArray`.
    pub required: usize,
}

#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub name: String,
    pub kind: TypeDeclKind,
    pub container: ContainerKind,
    /// Case-folded name of the `Inherits` base.
    pub base: Option<String>,
    pub(crate) storage: HashMap<String, StorageEntry>,
    pub(crate) methods: HashMap<String, Vec<MethodEntry>>,
    pub(crate) constructors: Vec<MethodEntry>,
}

/// All declarations of a compilation unit.
///
/// Partial declarations of the same type name are merged. Type names are
/// flat: nested and namespaced types are registered under their simple name.
#[derive(Debug, Default)]
pub struct SymbolTable {
    types: Vec<TypeInfo>,
    by_name: HashMap<String, TypeId>,
    modules: Vec<TypeId>,
    storage: Vec<StorageSymbol>,
    methods: Vec<MethodSignature>,
}

impl SymbolTable {
    pub fn build(unit: &CompilationUnit) -> Self {
        let mut table = Self::default();
        for item in &unit.items {
            table.add_item(item);
        }
        table
    }

    pub fn type_named(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn type_info(&self, id: TypeId) -> &TypeInfo {
        &self.types[id.0]
    }

    pub fn types(&self) -> impl Iterator<Item = (TypeId, &TypeInfo)> {
        self.types.iter().enumerate().map(|(i, t)| (TypeId(i), t))
    }

    pub(crate) fn modules(&self) -> &[TypeId] {
        &self.modules
    }

    pub(crate) fn storage_symbol(&self, id: StorageId) -> &StorageSymbol {
        &self.storage[id.0]
    }

    pub(crate) fn signature(&self, id: MethodId) -> &MethodSignature {
        &self.methods[id.0]
    }

    /// Base type of `id`, when it names a type declared in this unit.
    pub fn base_of(&self, id: TypeId) -> Option<TypeId> {
        self.type_info(id)
            .base
            .as_deref()
            .and_then(|base| self.type_named(base))
    }

    /// `id` followed by its declared bases, stopping at an unknown base or a cycle.
    pub fn ancestry(&self, id: TypeId) -> Vec<TypeId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(base) = self.base_of(current) {
            if chain.contains(&base) {
                break;
            }
            chain.push(base);
            current = base;
        }
        chain
    }

    /// Field or property `name` declared on `id` or one of its bases.
    pub(crate) fn find_storage(&self, id: TypeId, name: &str) -> Option<&StorageEntry> {
        let key = name.to_ascii_lowercase();
        self.ancestry(id)
            .into_iter()
            .find_map(|t| self.type_info(t).storage.get(&key))
    }

    /// Overload set `name` from the most derived type in the ancestry that declares it.
    pub(crate) fn find_methods(&self, id: TypeId, name: &str) -> Option<&[MethodEntry]> {
        let key = name.to_ascii_lowercase();
        self.ancestry(id)
            .into_iter()
            .find_map(|t| self.type_info(t).methods.get(&key))
            .map(Vec::as_slice)
    }

    fn add_item(&mut self, item: &Item) {
        match item {
            Item::Namespace(ns) => {
                for item in &ns.items {
                    self.add_item(item);
                }
            }
            Item::Type(decl) => self.add_type(decl),
        }
    }

    fn add_type(&mut self, decl: &TypeDecl) {
        let id = self.intern_type(decl);
        for member in &decl.members {
            match member {
                Member::Field(field) => self.add_field(id, field),
                Member::Property(property) => self.add_property(id, property),
                Member::Method(method) => self.add_method(id, method),
                Member::Type(nested) => self.add_type(nested),
            }
        }
    }

    fn intern_type(&mut self, decl: &TypeDecl) -> TypeId {
        let key = decl.name.key();
        if let Some(&id) = self.by_name.get(&key) {
            let info = &mut self.types[id.0];
            if info.base.is_none() {
                info.base = decl.inherits.as_ref().map(|b| b.simple_name().key());
            }
            return id;
        }

        let id = TypeId(self.types.len());
        let container = match decl.kind {
            TypeDeclKind::Structure => ContainerKind::Value,
            _ => ContainerKind::Reference,
        };
        self.types.push(TypeInfo {
            name: decl.name.text.clone(),
            kind: decl.kind,
            container,
            base: decl.inherits.as_ref().map(|b| b.simple_name().key()),
            storage: HashMap::new(),
            methods: HashMap::new(),
            constructors: Vec::new(),
        });
        self.by_name.insert(key, id);
        if decl.kind == TypeDeclKind::Module {
            self.modules.push(id);
        }
        id
    }

    fn add_storage(&mut self, owner: TypeId, symbol: StorageSymbol, ty: Option<&TypeRef>) {
        let key = symbol.name.to_ascii_lowercase();
        let id = StorageId(self.storage.len());
        self.storage.push(symbol);
        self.types[owner.0]
            .storage
            .entry(key)
            .or_insert(StorageEntry {
                id,
                ty: ty.and_then(type_key),
            });
    }

    fn add_field(&mut self, owner: TypeId, field: &FieldDecl) {
        let container = self.types[owner.0].container;
        for declarator in &field.declarators {
            let symbol = StorageSymbol {
                name: declarator.name.text.clone(),
                kind: StorageKind::Field,
                // A `Const` cannot be passed by reference at all; VB copies it.
                read_only: field.modifiers.read_only && !field.modifiers.constant,
                container,
            };
            self.add_storage(owner, symbol, declarator.ty.as_ref());
        }
    }

    fn add_property(&mut self, owner: TypeId, property: &PropertyDecl) {
        let container = self.types[owner.0].container;
        let symbol = StorageSymbol {
            name: property.name.text.clone(),
            kind: StorageKind::Property,
            read_only: property_is_read_only(property),
            container,
        };
        self.add_storage(owner, symbol, property.ty.as_ref());
    }

    fn add_method(&mut self, owner: TypeId, method: &MethodDecl) {
        let id = MethodId(self.methods.len());
        self.methods.push(signature_of(method));
        let entry = MethodEntry {
            id,
            return_type: method.return_type.as_ref().and_then(type_key),
            required: method
                .parameters
                .iter()
                .filter(|p| !p.optional && !p.param_array)
                .count(),
        };
        let info = &mut self.types[owner.0];
        if method.kind == MethodKind::Constructor {
            info.constructors.push(entry);
        } else {
            info.methods.entry(method.name.key()).or_default().push(entry);
        }
    }
}

/// Lookup key for a declared type. Arrays have no members worth resolving.
fn type_key(ty: &TypeRef) -> Option<String> {
    (!ty.is_array()).then(|| ty.simple_name().key())
}

/// `ReadOnly` properties and expanded properties without a `Set` accessor.
///
/// A `Set` accessor counts no matter its access modifier.
fn property_is_read_only(property: &PropertyDecl) -> bool {
    if property.modifiers.read_only {
        return true;
    }
    match &property.accessors {
        Some(accessors) => !accessors.iter().any(|a| a.kind == AccessorKind::Set),
        None => false,
    }
}

fn signature_of(method: &MethodDecl) -> MethodSignature {
    MethodSignature {
        name: method.name.text.clone(),
        parameters: method.parameters.iter().map(parameter_of).collect(),
        is_param_array: method.parameters.last().is_some_and(|p| p.param_array),
    }
}

fn parameter_of(decl: &ParameterDecl) -> Parameter {
    let modality = match decl.passing {
        PassingMode::ByVal => ParameterModality::ByValue,
        PassingMode::ByRef if decl.has_attribute("In") || decl.has_attribute("IsReadOnly") => {
            ParameterModality::ByReferenceInputOnly
        }
        PassingMode::ByRef => ParameterModality::ByReferenceMutable,
    };
    Parameter {
        name: decl.name.text.clone(),
        modality,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    fn table(source: &str) -> SymbolTable {
        let unit = parse_source(source).expect("source should parse");
        SymbolTable::build(&unit)
    }

    fn storage<'t>(table: &'t SymbolTable, ty: &str, name: &str) -> &'t StorageSymbol {
        let id = table.type_named(ty).expect("type exists");
        let entry = table.find_storage(id, name).expect("member exists");
        table.storage_symbol(entry.id)
    }

    #[test]
    fn classifies_read_only_storage() {
        let table = table(
            r#"
Structure Point
    Public A As Integer
    Public ReadOnly B As Integer
    Public Const C As Integer = 1
    Public Property D As Integer
    Public ReadOnly Property E As Integer
    Public Property F As Integer
        Get
            Return 0
        End Get
    End Property
    Public Property G As Integer
        Get
            Return 0
        End Get
        Private Set(value As Integer)
        End Set
    End Property
End Structure
"#,
        );
        let read_only = |name| storage(&table, "point", name).read_only;
        assert!(!read_only("A"));
        assert!(read_only("B"));
        assert!(!read_only("C"));
        assert!(!read_only("D"));
        assert!(read_only("E"));
        assert!(read_only("F"));
        assert!(!read_only("G"));
        assert_eq!(storage(&table, "Point", "a").container, ContainerKind::Value);
        assert_eq!(storage(&table, "Point", "E").kind, StorageKind::Property);
    }

    #[test]
    fn parameter_modalities() {
        let table = table(
            r#"
Module M
    Sub F(a As Integer, ByVal b As Integer, ByRef c As Integer, <[In]> ByRef d As Integer, <Out> ByRef e As Integer, ParamArray rest As Integer())
    End Sub
End Module
"#,
        );
        let m = table.type_named("m").expect("module");
        let overloads = table.find_methods(m, "f").expect("method");
        let sig = table.signature(overloads[0].id);
        let modalities: Vec<_> = sig.parameters.iter().map(|p| p.modality).collect();
        assert_eq!(
            modalities,
            vec![
                ParameterModality::ByValue,
                ParameterModality::ByValue,
                ParameterModality::ByReferenceMutable,
                ParameterModality::ByReferenceInputOnly,
                ParameterModality::ByReferenceMutable,
                ParameterModality::ByValue,
            ]
        );
        assert!(sig.is_param_array);
        assert_eq!(overloads[0].required, 5);
        assert_eq!(table.modules(), &[m]);
    }

    #[test]
    fn members_are_inherited_and_partials_merge() {
        let table = table(
            r#"
Class Base
    Public ReadOnly Origin As Integer
End Class

Partial Class Derived
    Inherits Base
End Class

Partial Class Derived
    Public Property Extra As Integer
End Class
"#,
        );
        let derived = table.type_named("Derived").expect("type");
        assert!(table.find_storage(derived, "origin").is_some());
        assert!(table.find_storage(derived, "extra").is_some());
        assert_eq!(table.ancestry(derived).len(), 2);
        assert_eq!(table.types().count(), 2);
    }

    #[test]
    fn inheritance_cycles_terminate() {
        let table = table(
            r#"
Class A
    Inherits B
End Class
Class B
    Inherits A
End Class
"#,
        );
        let a = table.type_named("a").expect("type");
        assert_eq!(table.ancestry(a).len(), 2);
        assert!(table.find_storage(a, "missing").is_none());
    }
}
