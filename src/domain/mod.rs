// Entity descriptors: the typed shape behind the dynamic records.
//
// One descriptor value per managed entity; the generic controller and the
// CRUD view engine are parameterized by these instead of being subclassed
// per entity.
use crate::storage::EntityKind;

/// How a submitted field is typed when it reaches storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Numeric id pointing at another entity's record.
    Reference,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

/// Cross-entity reference (Duvida -> Area): which field carries the id, what
/// it must resolve to, and the context key forms use for the selector list.
#[derive(Debug, Clone, Copy)]
pub struct Reference {
    pub field: &'static str,
    pub target: EntityKind,
    pub context_key: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct EntityDescriptor {
    pub kind: EntityKind,
    pub fields: &'static [FieldSpec],
    /// Field rejected when its value is already in use by another record.
    pub unique_field: &'static str,
    pub reference: Option<Reference>,
}

pub static AREA: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Area,
    fields: &[FieldSpec { name: "name", kind: FieldKind::Text, required: true }],
    unique_field: "name",
    reference: None,
};

pub static DUVIDA: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Duvida,
    fields: &[
        FieldSpec { name: "title", kind: FieldKind::Text, required: true },
        FieldSpec { name: "body", kind: FieldKind::Text, required: true },
        FieldSpec { name: "area_id", kind: FieldKind::Reference, required: true },
    ],
    unique_field: "title",
    reference: Some(Reference {
        field: "area_id",
        target: EntityKind::Area,
        context_key: "areas",
    }),
};

pub static PROJETO: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Projeto,
    fields: &[
        FieldSpec { name: "title", kind: FieldKind::Text, required: true },
        FieldSpec { name: "initial_description", kind: FieldKind::Text, required: true },
        FieldSpec { name: "final_description", kind: FieldKind::Text, required: true },
    ],
    unique_field: "title",
    reference: None,
};

pub static TAG: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Tag,
    fields: &[FieldSpec { name: "name", kind: FieldKind::Text, required: true }],
    unique_field: "name",
    reference: None,
};

/// Descriptor lookup by kind.
pub fn descriptor(kind: EntityKind) -> &'static EntityDescriptor {
    match kind {
        EntityKind::Area => &AREA,
        EntityKind::Duvida => &DUVIDA,
        EntityKind::Projeto => &PROJETO,
        EntityKind::Tag => &TAG,
    }
}
