use async_graphql::dynamic::{
    Enum, Field, FieldFuture, FieldValue, InputValue, Object, ResolverContext, Scalar, Schema,
    TypeRef,
};
use async_graphql_parser::parse_schema;
use async_graphql_parser::types as pt;
use lambdaql_core::{InvocationContext, LambdaqlError, Stash};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

const QUERY: &str = "Query";
const MUTATION: &str = "Mutation";

/// Produces the JSON value of one root field.
#[async_trait::async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(
        &self,
        args: &Stash,
        context: &InvocationContext,
    ) -> lambdaql_core::Result<serde_json::Value>;
}

/// Maps root field names to the resolvers that answer them.
#[derive(Clone, Default)]
pub struct ResolverRegistry {
    queries: HashMap<String, Arc<dyn Resolver>>,
    mutations: HashMap<String, Arc<dyn Resolver>>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, field: impl Into<String>, resolver: Arc<dyn Resolver>) -> Self {
        self.queries.insert(field.into(), resolver);
        self
    }

    pub fn mutation(mut self, field: impl Into<String>, resolver: Arc<dyn Resolver>) -> Self {
        self.mutations.insert(field.into(), resolver);
        self
    }

    fn for_root(&self, root: &str) -> &HashMap<String, Arc<dyn Resolver>> {
        if root == MUTATION {
            &self.mutations
        } else {
            &self.queries
        }
    }
}

/// Convert parser Type (struct with base+nullable) to dynamic TypeRef.
fn convert_type(ty: &pt::Type) -> TypeRef {
    match (&ty.base, ty.nullable) {
        (pt::BaseType::Named(name), true) => TypeRef::named(name.as_ref()),
        (pt::BaseType::Named(name), false) => TypeRef::named_nn(name.as_ref()),
        (pt::BaseType::List(inner), nullable) => {
            let inner_ref = convert_type(inner);
            if nullable {
                TypeRef::List(Box::new(inner_ref))
            } else {
                TypeRef::NonNull(Box::new(TypeRef::List(Box::new(inner_ref))))
            }
        }
    }
}

/// How a field's JSON value is handed to the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Scalar,
    Enum,
    Entity,
}

/// Scalars and enums declared in the SDL, on top of the built-in scalars.
#[derive(Default)]
struct LeafTypes {
    scalars: HashSet<String>,
    enums: HashSet<String>,
}

impl LeafTypes {
    fn shape(&self, type_name: &str) -> Shape {
        if is_builtin_scalar(type_name) || self.scalars.contains(type_name) {
            Shape::Scalar
        } else if self.enums.contains(type_name) {
            Shape::Enum
        } else {
            Shape::Entity
        }
    }
}

fn is_builtin_scalar(type_name: &str) -> bool {
    matches!(
        type_name,
        "String" | "Int" | "Float" | "Boolean" | "ID" | "Date"
    )
}

/// Get the base type name (unwrapping List wrappers).
fn base_type_name(ty: &pt::Type) -> &str {
    match &ty.base {
        pt::BaseType::Named(n) => n.as_ref(),
        pt::BaseType::List(inner) => base_type_name(inner),
    }
}

/// Wrap a JSON value as a field result; objects stay JSON so child fields can read them.
fn json_field_value(value: serde_json::Value, shape: Shape) -> Option<FieldValue<'static>> {
    match (value, shape) {
        (serde_json::Value::Null, _) => None,
        (serde_json::Value::Array(items), Shape::Enum | Shape::Entity) => Some(FieldValue::list(
            items
                .into_iter()
                .map(|item| json_field_value(item, shape).unwrap_or(FieldValue::NULL)),
        )),
        (serde_json::Value::String(name), Shape::Enum) => Some(FieldValue::value(
            async_graphql::Value::Enum(async_graphql::Name::new(name)),
        )),
        (v, Shape::Scalar | Shape::Enum) => Some(FieldValue::value(
            async_graphql::Value::from_json(v).unwrap_or(async_graphql::Value::Null),
        )),
        (v, Shape::Entity) => Some(FieldValue::owned_any(v)),
    }
}

fn args_to_stash(ctx: &ResolverContext<'_>) -> Stash {
    ctx.args
        .iter()
        .map(|(k, v)| {
            let json = v
                .as_value()
                .clone()
                .into_json()
                .unwrap_or(serde_json::Value::Null);
            (k.to_string(), json)
        })
        .collect()
}

/// Entity field: read the value from the parent JSON object.
fn entity_field(field_name: String, type_ref: TypeRef, shape: Shape) -> Field {
    Field::new(field_name.clone(), type_ref, move |ctx| {
        let fname = field_name.clone();
        FieldFuture::new(async move {
            let parent = ctx.parent_value.try_downcast_ref::<serde_json::Value>()?;
            Ok(parent
                .get(&fname)
                .cloned()
                .and_then(|v| json_field_value(v, shape)))
        })
    })
}

/// Root field: hand the arguments and invocation context to the registered resolver.
fn root_field(
    field_def: &pt::FieldDefinition,
    resolver: Option<Arc<dyn Resolver>>,
    shape: Shape,
) -> Field {
    let field_name = field_def.name.node.to_string();

    let mut field = Field::new(field_name, convert_type(&field_def.ty.node), move |ctx| {
        let resolver = resolver.clone();
        FieldFuture::new(async move {
            let Some(resolver) = resolver else {
                return Ok(FieldValue::NONE);
            };
            let args = args_to_stash(&ctx);
            let invocation = ctx
                .data_opt::<InvocationContext>()
                .cloned()
                .unwrap_or_default();
            let value = resolver
                .resolve(&args, &invocation)
                .await
                .map_err(|e| async_graphql::Error::new(e.to_string()))?;
            Ok(json_field_value(value, shape))
        })
    });

    for arg_def in &field_def.arguments {
        let arg_name = arg_def.node.name.node.to_string();
        let arg_type = convert_type(&arg_def.node.ty.node);
        field = field.argument(InputValue::new(arg_name, arg_type));
    }

    field
}

/// Build a complete dynamic Schema from GraphQL SDL and the registered root resolvers.
///
/// Root fields without a resolver resolve to null. Object types, scalars and enums are
/// supported; interfaces, unions and input objects are rejected.
pub fn build_schema(
    schema_text: &str,
    registry: &ResolverRegistry,
) -> lambdaql_core::Result<Schema> {
    let service_doc = parse_schema(schema_text)
        .map_err(|e| LambdaqlError::Schema(format!("Schema parse error: {e}")))?;

    // Collect type definitions keyed by name
    let mut object_types: HashMap<String, Vec<pt::FieldDefinition>> = HashMap::new();
    let mut enum_types: HashMap<String, Vec<String>> = HashMap::new();
    let mut leaves = LeafTypes::default();
    for def in &service_doc.definitions {
        let pt::TypeSystemDefinition::Type(td) = def else {
            continue;
        };
        let type_def = &td.node;
        let name = type_def.name.node.to_string();
        match &type_def.kind {
            pt::TypeKind::Object(obj) => {
                let fields: Vec<pt::FieldDefinition> =
                    obj.fields.iter().map(|f| f.node.clone()).collect();
                object_types.insert(name, fields);
            }
            pt::TypeKind::Scalar => {
                leaves.scalars.insert(name);
            }
            pt::TypeKind::Enum(e) => {
                let values = e
                    .values
                    .iter()
                    .map(|v| v.node.value.node.to_string())
                    .collect();
                leaves.enums.insert(name.clone());
                enum_types.insert(name, values);
            }
            _ => {
                return Err(LambdaqlError::Schema(format!(
                    "type {name} is not an object, scalar or enum"
                )))
            }
        }
    }

    if !object_types.contains_key(QUERY) {
        return Err(LambdaqlError::Schema(
            "schema must define a Query type".to_string(),
        ));
    }

    let mutation = object_types.contains_key(MUTATION).then_some(MUTATION);
    let mut schema_builder = Schema::build(QUERY, mutation, None);
    // Date is always available; the GraphQL built-ins need no registration.
    let custom_scalars: HashSet<&str> = leaves
        .scalars
        .iter()
        .map(String::as_str)
        .filter(|name| !is_builtin_scalar(name))
        .chain(["Date"])
        .collect();
    for scalar in custom_scalars {
        schema_builder = schema_builder.register(Scalar::new(scalar));
    }
    for (name, values) in &enum_types {
        schema_builder =
            schema_builder.register(Enum::new(name.as_str()).items(values.iter().map(String::as_str)));
    }

    for (type_name, fields) in &object_types {
        let mut object = Object::new(type_name.as_str());

        if type_name == QUERY || type_name == MUTATION {
            let resolvers = registry.for_root(type_name);
            for field_def in fields {
                let resolver = resolvers.get(field_def.name.node.as_str()).cloned();
                let shape = leaves.shape(base_type_name(&field_def.ty.node));
                object = object.field(root_field(field_def, resolver, shape));
            }
        } else {
            for field_def in fields {
                let field_name = field_def.name.node.to_string();
                let shape = leaves.shape(base_type_name(&field_def.ty.node));
                object = object.field(entity_field(
                    field_name,
                    convert_type(&field_def.ty.node),
                    shape,
                ));
            }
        }

        schema_builder = schema_builder.register(object);
    }

    schema_builder
        .finish()
        .map_err(|e| LambdaqlError::Schema(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixed(serde_json::Value);

    #[async_trait::async_trait]
    impl Resolver for Fixed {
        async fn resolve(
            &self,
            _args: &Stash,
            _context: &InvocationContext,
        ) -> lambdaql_core::Result<serde_json::Value> {
            Ok(self.0.clone())
        }
    }

    const SDL: &str = r#"
        type Author { name: String }
        type Book { id: ID!, title: String, tags: [String], author: Author }
        type Query { books: [Book!]!, greeting: String, unbound: String }
    "#;

    fn registry() -> ResolverRegistry {
        ResolverRegistry::new()
            .query(
                "books",
                Arc::new(Fixed(json!([
                    {"id": "1", "title": "Dune", "tags": ["sf"], "author": {"name": "Herbert"}}
                ]))),
            )
            .query("greeting", Arc::new(Fixed(json!("hello"))))
    }

    #[tokio::test]
    async fn resolves_nested_entities_from_json() {
        let schema = build_schema(SDL, &registry()).unwrap();
        let response = schema
            .execute("{ books { id title tags author { name } } greeting unbound }")
            .await;

        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let data = response.data.into_json().unwrap();
        assert_eq!(
            data,
            json!({
                "books": [{"id": "1", "title": "Dune", "tags": ["sf"], "author": {"name": "Herbert"}}],
                "greeting": "hello",
                "unbound": null
            })
        );
    }

    #[tokio::test]
    async fn declared_scalars_and_enums_are_supported() {
        let sdl = r#"
            scalar Url
            enum Genre { FICTION, HISTORY }
            type Book { title: String, link: Url, genre: Genre, shelves: [Genre] }
            type Query { featured: Book, genres: [Genre!]! }
        "#;
        let registry = ResolverRegistry::new()
            .query(
                "featured",
                Arc::new(Fixed(json!({
                    "title": "SPQR",
                    "link": "https://example.com/spqr",
                    "genre": "HISTORY",
                    "shelves": ["HISTORY", "FICTION"]
                }))),
            )
            .query("genres", Arc::new(Fixed(json!(["FICTION", "HISTORY"]))));

        let schema = build_schema(sdl, &registry).unwrap();
        let response = schema
            .execute("{ featured { title link genre shelves } genres }")
            .await;

        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(
            response.data.into_json().unwrap(),
            json!({
                "featured": {
                    "title": "SPQR",
                    "link": "https://example.com/spqr",
                    "genre": "HISTORY",
                    "shelves": ["HISTORY", "FICTION"]
                },
                "genres": ["FICTION", "HISTORY"]
            })
        );
    }

    #[test]
    fn unsupported_type_kinds_are_rejected() {
        let err = build_schema(
            "input BookInput { title: String } type Query { a: String }",
            &ResolverRegistry::new(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, LambdaqlError::Schema(_)));
    }

    #[test]
    fn schema_without_query_type_is_rejected() {
        let err = build_schema("type Book { id: ID }", &ResolverRegistry::new())
            .err()
            .unwrap();
        assert!(matches!(err, LambdaqlError::Schema(_)));
    }

    #[test]
    fn invalid_sdl_is_rejected() {
        assert!(build_schema("type Query {", &ResolverRegistry::new()).is_err());
    }
}
