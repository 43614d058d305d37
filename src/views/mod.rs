// Generic CRUD view engine. Every request walks the same state machine:
// AuthGate -> OperationSelect -> (Render | Mutate -> Render | Redirect).
// The per-entity admins are data (see adapters.rs), never subclasses.
use std::sync::Arc;

use axum::extract::{FromRequest, Path, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Form, Router};
use serde_json::{Map, Value};

use crate::auth::AuthResolver;
use crate::controller::{EntityController, FormFields, SaveOutcome, ValidationFailure};
use crate::error::AppError;
use crate::render::{base_context, RenderContext, Renderer, LIMBO_TEMPLATE};
use crate::storage::Storage;

pub mod adapters;

pub use adapters::ViewAdapter;

/// Injected collaborators, shared by every route.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Storage>,
    pub renderer: Arc<dyn Renderer>,
    pub resolver: Arc<dyn AuthResolver>,
}

#[derive(Clone)]
struct EntityState {
    app: AppState,
    adapter: &'static ViewAdapter,
}

impl EntityState {
    fn controller(&self) -> EntityController {
        EntityController::new(self.adapter.entity, self.app.store.clone())
    }
}

/// Routes for one entity admin, all bound to the shared engine.
pub fn entity_routes(adapter: &'static ViewAdapter, app: AppState) -> Router {
    let state = EntityState { app, adapter };
    let name = adapter.name;
    Router::new()
        .route(&format!("/{}/", name), get(object_list))
        .route(
            &format!("/{}/create", name),
            get(create_screen).post(create_submit),
        )
        .route(&format!("/{}/:id", name), delete(object_delete))
        // Detail and edit are two bindings into one handler family; the
        // branch is the static route shape, never a query parameter.
        .route(&format!("/{}/:id/details", name), get(detail_screen))
        .route(
            &format!("/{}/:id/edit", name),
            get(edit_screen).post(edit_submit),
        )
        .with_state(state)
}

/// The full admin surface: area, duvida, projeto, tag.
pub fn admin_router(app: AppState) -> Router {
    adapters::ALL
        .iter()
        .fold(Router::new(), |router, adapter| {
            router.merge(entity_routes(*adapter, app.clone()))
        })
}

/// AuthGate. Fail-closed: anything short of an explicit membership flag
/// renders the limbo template with a not-found status, and no controller is
/// ever constructed for the request.
async fn gate(state: &EntityState, headers: &HeaderMap) -> Result<RenderContext, Response> {
    let auth = state.app.resolver.resolve(headers).await;
    let context = base_context(&auth);
    if auth.member() {
        Ok(context)
    } else {
        tracing::debug!(entity = state.adapter.name, "gate denied");
        Err(state
            .app
            .renderer
            .render(LIMBO_TEMPLATE, &context, StatusCode::NOT_FOUND)
            .await)
    }
}

/// Item ids are parsed only after the gate has passed; a non-numeric id on a
/// member request is just a missing page.
fn parse_id(state: &EntityState, raw: &str) -> Result<i64, AppError> {
    raw.parse().map_err(|_| {
        AppError::not_found(format!("{} {} not found", state.adapter.name, raw))
    })
}

/// Form decode, deferred until after the gate. A decode failure on a member
/// request surfaces as the extractor's own rejection.
async fn read_form(request: Request) -> Result<FormFields, Response> {
    match Form::<FormFields>::from_request(request, &()).await {
        Ok(Form(fields)) => Ok(fields),
        Err(rejection) => Err(rejection.into_response()),
    }
}

/// Redirect-after-write target: the entity's list route.
fn redirect_to_list(adapter: &ViewAdapter) -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, format!("/{}/", adapter.name))],
    )
        .into_response()
}

fn objects_value(records: Vec<crate::storage::Record>) -> Value {
    Value::Array(records.into_iter().map(Value::Object).collect())
}

/// Echo map in the adapter's declared field order.
fn echoed_fields(adapter: &ViewAdapter, failure: &ValidationFailure) -> Value {
    let mut map = Map::new();
    for name in adapter.form_fields {
        map.insert(
            name.to_string(),
            Value::from(failure.echoed.get(*name).cloned().unwrap_or_default()),
        );
    }
    Value::Object(map)
}

async fn add_related(
    state: &EntityState,
    controller: &EntityController,
    context: &mut RenderContext,
) -> Result<(), AppError> {
    if let Some(reference) = state.adapter.entity.reference {
        let related = controller.list_related().await?;
        context.insert(reference.context_key.to_string(), objects_value(related));
    }
    Ok(())
}

/// GET /{entity}/
async fn object_list(
    State(state): State<EntityState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let mut context = match gate(&state, &headers).await {
        Ok(context) => context,
        Err(denied) => return Ok(denied),
    };

    let objects = state.controller().list_all().await?;
    context.insert("objects".to_string(), objects_value(objects));
    Ok(state
        .app
        .renderer
        .render(state.adapter.list_template, &context, StatusCode::OK)
        .await)
}

/// DELETE /{entity}/{id}
async fn object_delete(
    State(state): State<EntityState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if let Err(denied) = gate(&state, &headers).await {
        return Ok(denied);
    }

    let id = parse_id(&state, &id)?;
    state.controller().delete(id).await?;
    Ok(StatusCode::OK.into_response())
}

/// GET /{entity}/create
async fn create_screen(
    State(state): State<EntityState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let mut context = match gate(&state, &headers).await {
        Ok(context) => context,
        Err(denied) => return Ok(denied),
    };

    let controller = state.controller();
    add_related(&state, &controller, &mut context).await?;
    Ok(state
        .app
        .renderer
        .render(state.adapter.create_template, &context, StatusCode::OK)
        .await)
}

/// POST /{entity}/create
///
/// Takes the raw request so the gate runs before the body is decoded; a
/// malformed submission from a non-member must still look like a missing
/// page, never an extractor rejection.
async fn create_submit(
    State(state): State<EntityState>,
    request: Request,
) -> Result<Response, AppError> {
    let mut context = match gate(&state, request.headers()).await {
        Ok(context) => context,
        Err(denied) => return Ok(denied),
    };

    let fields = match read_form(request).await {
        Ok(fields) => fields,
        Err(rejection) => return Ok(rejection),
    };

    match state.controller().create(&fields).await? {
        SaveOutcome::Saved(_) => Ok(redirect_to_list(state.adapter)),
        SaveOutcome::Rejected(failure) => {
            // Redisplay, not a transport-level client error.
            context.insert("error".to_string(), Value::from(failure.message.clone()));
            context.insert(
                "fields".to_string(),
                echoed_fields(state.adapter, &failure),
            );
            Ok(state
                .app
                .renderer
                .render(state.adapter.create_template, &context, StatusCode::OK)
                .await)
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum EditIntent {
    Detail,
    Edit,
}

/// GET /{entity}/{id}/details
async fn detail_screen(
    State(state): State<EntityState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    edit_family_screen(state, id, headers, EditIntent::Detail).await
}

/// GET /{entity}/{id}/edit
async fn edit_screen(
    State(state): State<EntityState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    edit_family_screen(state, id, headers, EditIntent::Edit).await
}

/// Shared GET handler for the detail and edit routes. Both fail with 404 on
/// a missing record; they differ only in template and selector data.
async fn edit_family_screen(
    state: EntityState,
    id: String,
    headers: HeaderMap,
    intent: EditIntent,
) -> Result<Response, AppError> {
    let mut context = match gate(&state, &headers).await {
        Ok(context) => context,
        Err(denied) => return Ok(denied),
    };

    let id = parse_id(&state, &id)?;
    let controller = state.controller();
    let record = controller
        .get_one(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("{} {} not found", state.adapter.name, id)))?;
    context.insert("object".to_string(), Value::Object(record));

    let template = match intent {
        EditIntent::Detail => state.adapter.detail_template,
        EditIntent::Edit => {
            add_related(&state, &controller, &mut context).await?;
            state.adapter.edit_template
        }
    };
    Ok(state
        .app
        .renderer
        .render(template, &context, StatusCode::OK)
        .await)
}

/// POST /{entity}/{id}/edit
///
/// Same ordering as create_submit: gate, then id parse, then form decode.
async fn edit_submit(
    State(state): State<EntityState>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Response, AppError> {
    let mut context = match gate(&state, request.headers()).await {
        Ok(context) => context,
        Err(denied) => return Ok(denied),
    };

    let id = parse_id(&state, &id)?;
    let fields = match read_form(request).await {
        Ok(fields) => fields,
        Err(rejection) => return Ok(rejection),
    };

    let controller = state.controller();
    let existing = controller
        .get_one(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("{} {} not found", state.adapter.name, id)))?;

    match controller.update(&existing, &fields).await? {
        SaveOutcome::Saved(_) => Ok(redirect_to_list(state.adapter)),
        SaveOutcome::Rejected(failure) => {
            context.insert("id".to_string(), Value::from(id));
            context.insert("error".to_string(), Value::from(failure.message.clone()));
            context.insert(
                "fields".to_string(),
                echoed_fields(state.adapter, &failure),
            );
            Ok(state
                .app
                .renderer
                .render(state.adapter.edit_template, &context, StatusCode::OK)
                .await)
        }
    }
}
