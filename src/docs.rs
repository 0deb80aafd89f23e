//! OpenAPI document for the generated routes, built from the registry at startup.

use crate::config::{FieldKind, Operation, ResourceRegistry, ResourceSchema};
use crate::error::MessageBody;
use crate::handlers::{LoginData, TokenResponse};
use utoipa::openapi::content::ContentBuilder;
use utoipa::openapi::path::{Operation as ApiOperation, OperationBuilder, ParameterBuilder, ParameterIn};
use utoipa::openapi::request_body::RequestBodyBuilder;
use utoipa::openapi::response::{Response, ResponseBuilder};
use utoipa::openapi::schema::{Array, ObjectBuilder, Ref, Schema, Type};
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityRequirement, SecurityScheme};
use utoipa::openapi::{
    ComponentsBuilder, InfoBuilder, OpenApi, OpenApiBuilder, PathItem, PathsBuilder, RefOr, Required,
};

const BEARER: &str = "bearer";
const JSON: &str = "application/json";

pub fn openapi(registry: &ResourceRegistry) -> OpenApi {
    let mut components = ComponentsBuilder::new()
        .schema_from::<MessageBody>()
        .schema_from::<LoginData>()
        .schema_from::<TokenResponse>()
        .security_scheme(BEARER, SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)));
    let mut paths = PathsBuilder::new().path("/tokens/", token_path());

    for resource in registry.iter() {
        components = components.schema(resource.name.clone(), resource_schema(resource));
        let (collection, item) = resource_paths(resource);
        if let Some(collection) = collection {
            paths = paths.path(format!("/{}/", resource.path_segment), collection);
        }
        if let Some(item) = item {
            paths = paths.path(format!("/{}/{{id}}", resource.path_segment), item);
        }
    }

    OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title(env!("CARGO_PKG_NAME"))
                .version(env!("CARGO_PKG_VERSION"))
                .build(),
        )
        .paths(paths.build())
        .components(Some(components.build()))
        .build()
}

fn scalar(kind: FieldKind) -> RefOr<Schema> {
    let ty = match kind {
        FieldKind::Integer => Type::Integer,
        FieldKind::Float => Type::Number,
        FieldKind::String => Type::String,
        FieldKind::Boolean => Type::Boolean,
    };
    RefOr::T(Schema::Object(ObjectBuilder::new().schema_type(ty).build()))
}

/// Rendered shape: render fields only, in order.
fn resource_schema(resource: &ResourceSchema) -> RefOr<Schema> {
    let mut obj = ObjectBuilder::new();
    for name in &resource.render_fields {
        if let Some(f) = resource.field(name) {
            obj = obj.property(name.clone(), scalar(f.kind));
        }
    }
    RefOr::T(Schema::Object(obj.build()))
}

/// Request payload: every non-identity field, required ones marked.
fn payload_schema(resource: &ResourceSchema, partial: bool) -> RefOr<Schema> {
    let mut obj = ObjectBuilder::new();
    for f in resource.data_fields() {
        obj = obj.property(f.name.clone(), scalar(f.kind));
        if f.required && f.default.is_none() && !partial {
            obj = obj.required(f.name.clone());
        }
    }
    RefOr::T(Schema::Object(obj.build()))
}

fn json_response(description: &str, schema: Option<RefOr<Schema>>) -> Response {
    let builder = ResponseBuilder::new().description(description);
    match schema {
        Some(schema) => builder
            .content(JSON, ContentBuilder::new().schema(Some(schema)).build())
            .build(),
        None => builder.build(),
    }
}

fn message(description: &str) -> Response {
    json_response(description, Some(Ref::from_schema_name("MessageBody").into()))
}

fn operation(resource: &ResourceSchema, op: Operation) -> ApiOperation {
    let rendered = || -> RefOr<Schema> { Ref::from_schema_name(resource.name.clone()).into() };
    let mut b = OperationBuilder::new()
        .operation_id(Some(format!("{}_{}", op.as_str(), resource.name)))
        .tag(resource.name.clone())
        .security(SecurityRequirement::new(BEARER, Vec::<String>::new()))
        .response("401", message("Not authenticated"));
    if matches!(op, Operation::Read | Operation::Update | Operation::Delete) {
        b = b
            .parameter(
                ParameterBuilder::new()
                    .name("id")
                    .parameter_in(ParameterIn::Path)
                    .required(Required::True)
                    .schema(Some(scalar(FieldKind::Integer))),
            )
            .response("404", message("Not found"));
    }
    if matches!(op, Operation::Create | Operation::Update) {
        let body = RequestBodyBuilder::new()
            .content(
                JSON,
                ContentBuilder::new()
                    .schema(Some(payload_schema(resource, op == Operation::Update)))
                    .build(),
            )
            .required(Some(Required::True))
            .build();
        b = b.request_body(Some(body)).response("400", message("Invalid payload"));
    }
    match op {
        Operation::List => {
            for name in ["filters", "ordering"] {
                b = b.parameter(
                    ParameterBuilder::new()
                        .name(name)
                        .parameter_in(ParameterIn::Query)
                        .required(Required::False)
                        .schema(Some(scalar(FieldKind::String))),
                );
            }
            let list = RefOr::T(Schema::Array(Array::new(rendered())));
            b.response("200", json_response("Rendered entities", Some(list)))
                .response("400", message("Invalid filter or ordering"))
        }
        Operation::Create => b.response("201", json_response("Created", Some(rendered()))),
        Operation::Read | Operation::Update => b.response("200", json_response("Entity", Some(rendered()))),
        Operation::Delete => b.response("204", json_response("Deleted", None)),
    }
    .build()
}

fn resource_paths(resource: &ResourceSchema) -> (Option<PathItem>, Option<PathItem>) {
    let mut collection: Option<PathItem> = None;
    let mut item: Option<PathItem> = None;
    for op in Operation::ALL.iter().copied().filter(|op| resource.allows(*op)) {
        let built = Some(operation(resource, op));
        match op {
            Operation::List => collection.get_or_insert_with(PathItem::default).get = built,
            Operation::Create => collection.get_or_insert_with(PathItem::default).post = built,
            Operation::Read => item.get_or_insert_with(PathItem::default).get = built,
            Operation::Update => item.get_or_insert_with(PathItem::default).patch = built,
            Operation::Delete => item.get_or_insert_with(PathItem::default).delete = built,
        }
    }
    (collection, item)
}

fn token_path() -> PathItem {
    let body = RequestBodyBuilder::new()
        .content(
            JSON,
            ContentBuilder::new()
                .schema(Some(RefOr::from(Ref::from_schema_name("LoginData"))))
                .build(),
        )
        .required(Some(Required::True))
        .build();
    let op = OperationBuilder::new()
        .operation_id(Some("create_token"))
        .tag("tokens")
        .request_body(Some(body))
        .response(
            "200",
            json_response("Bearer token", Some(Ref::from_schema_name("TokenResponse").into())),
        )
        .response("400", message("Email and password do not match"))
        .build();
    let mut item = PathItem::default();
    item.post = Some(op);
    item
}
