// Per-entity view adapters: pure data. Template names, the route segment,
// and the ordered form fields echoed back on a validation failure. All
// behavior lives in the generic engine.
use crate::domain::{self, EntityDescriptor};

pub struct ViewAdapter {
    /// Route segment and log label ("area" -> /area/...).
    pub name: &'static str,
    pub entity: &'static EntityDescriptor,
    pub list_template: &'static str,
    pub create_template: &'static str,
    pub edit_template: &'static str,
    pub detail_template: &'static str,
    /// Ordered form fields to echo when a submission is rejected.
    pub form_fields: &'static [&'static str],
}

pub static AREA_ADMIN: ViewAdapter = ViewAdapter {
    name: "area",
    entity: &domain::AREA,
    list_template: "admin/area/list.html",
    create_template: "admin/area/create.html",
    edit_template: "admin/area/edit.html",
    detail_template: "admin/area/details.html",
    form_fields: &["name"],
};

pub static DUVIDA_ADMIN: ViewAdapter = ViewAdapter {
    name: "duvida",
    entity: &domain::DUVIDA,
    list_template: "admin/duvida/list.html",
    create_template: "admin/duvida/create.html",
    edit_template: "admin/duvida/edit.html",
    detail_template: "admin/duvida/details.html",
    form_fields: &["title", "body", "area_id"],
};

pub static PROJETO_ADMIN: ViewAdapter = ViewAdapter {
    name: "projeto",
    entity: &domain::PROJETO,
    list_template: "admin/projeto/list.html",
    create_template: "admin/projeto/create.html",
    edit_template: "admin/projeto/edit.html",
    detail_template: "admin/projeto/details.html",
    form_fields: &["title", "initial_description", "final_description"],
};

pub static TAG_ADMIN: ViewAdapter = ViewAdapter {
    name: "tag",
    entity: &domain::TAG,
    list_template: "admin/tag/list.html",
    create_template: "admin/tag/create.html",
    edit_template: "admin/tag/edit.html",
    detail_template: "admin/tag/details.html",
    form_fields: &["name"],
};

pub static ALL: [&ViewAdapter; 4] = [&AREA_ADMIN, &DUVIDA_ADMIN, &PROJETO_ADMIN, &TAG_ADMIN];
