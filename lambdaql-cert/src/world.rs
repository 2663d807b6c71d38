use cucumber::World;
use lambdaql_core::testing::{self as fixtures, ScriptedEngine, ScriptedFailure};
use lambdaql_core::{BoxError, InboundEvent, InvocationContext, ResponseEnvelope};
use lambdaql_graphlette::GraphQLOptions;
use lambdaql_lambda::LambdaHandler;
use std::fmt;
use std::sync::Arc;

enum Handler {
    Scripted(LambdaHandler<ScriptedEngine>),
    GraphQL(LambdaHandler<GraphQLOptions>),
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Scripted(_) => write!(f, "Handler(scripted)"),
            Handler::GraphQL(_) => write!(f, "Handler(graphql)"),
        }
    }
}

#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct AdapterWorld {
    handler: Option<Handler>,
    pub engine: Option<Arc<ScriptedEngine>>,

    pub event: InboundEvent,
    pub context: InvocationContext,

    pub envelope: Option<ResponseEnvelope>,
    pub error: Option<String>,
    pub error_is_scripted: bool,
}

impl AdapterWorld {
    pub fn new() -> Self {
        Self {
            handler: None,
            engine: None,
            event: InboundEvent::new("GET", fixtures::GRAPHQL_PATH),
            context: fixtures::context(),
            envelope: None,
            error: None,
            error_is_scripted: false,
        }
    }

    /// Serve through a scripted engine the world keeps a handle on.
    pub fn set_engine(&mut self, engine: ScriptedEngine) {
        let engine = Arc::new(engine);
        self.handler = Some(Handler::Scripted(lambdaql_lambda::graphql_lambda(
            lambdaql_core::OptionsSource::Static(Arc::clone(&engine)),
        )));
        self.engine = Some(engine);
    }

    pub fn set_graphql(&mut self, handler: LambdaHandler<GraphQLOptions>) {
        self.handler = Some(Handler::GraphQL(handler));
        self.engine = None;
    }

    pub fn engine(&self) -> &ScriptedEngine {
        self.engine.as_deref().expect("scripted engine not initialized")
    }

    pub async fn invoke(&mut self) {
        let event = self.event.clone();
        let result: Result<ResponseEnvelope, BoxError> = match &self.handler {
            Some(Handler::Scripted(h)) => h.handle(event, &mut self.context).await,
            Some(Handler::GraphQL(h)) => h.handle(event, &mut self.context).await,
            None => panic!("handler not initialized"),
        };
        match result {
            Ok(envelope) => {
                self.envelope = Some(envelope);
                self.error = None;
            }
            Err(e) => {
                self.error_is_scripted = e.downcast_ref::<ScriptedFailure>().is_some();
                self.error = Some(e.to_string());
                self.envelope = None;
            }
        }
    }

    pub fn envelope(&self) -> &ResponseEnvelope {
        self.envelope.as_ref().expect("no response envelope")
    }

    pub fn body_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.envelope().body).expect("response body is not JSON")
    }
}
