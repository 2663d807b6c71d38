use crate::{BoxError, HttpQueryError, InboundEvent, InvocationContext, QueryError};
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

pub type OptionsFn<O> = dyn Fn(&InboundEvent, &InvocationContext) -> BoxFuture<'static, Result<O, BoxError>>
    + Send
    + Sync;

/// Where a handler gets its query options from on each invocation.
pub enum OptionsSource<O> {
    /// One options record shared by every invocation.
    Static(Arc<O>),
    /// Options derived from the inbound event and context.
    Derived(Arc<OptionsFn<O>>),
}

impl<O> Clone for OptionsSource<O> {
    fn clone(&self) -> Self {
        match self {
            OptionsSource::Static(options) => OptionsSource::Static(Arc::clone(options)),
            OptionsSource::Derived(f) => OptionsSource::Derived(Arc::clone(f)),
        }
    }
}

impl<O> From<O> for OptionsSource<O> {
    fn from(options: O) -> Self {
        OptionsSource::Static(Arc::new(options))
    }
}

impl<O: Send + Sync + 'static> OptionsSource<O> {
    pub fn derived<F, Fut>(f: F) -> Self
    where
        F: Fn(&InboundEvent, &InvocationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, BoxError>> + Send + 'static,
    {
        let derive: Arc<OptionsFn<O>> = Arc::new(
            move |event: &InboundEvent,
                  context: &InvocationContext|
                  -> BoxFuture<'static, Result<O, BoxError>> { Box::pin(f(event, context)) },
        );
        OptionsSource::Derived(derive)
    }

    /// Resolve the options for one invocation.
    ///
    /// A failing derivation is reported as a 500 tagged query error with a JSON body.
    pub async fn resolve(
        &self,
        event: &InboundEvent,
        context: &InvocationContext,
    ) -> Result<Arc<O>, QueryError> {
        match self {
            OptionsSource::Static(options) => Ok(Arc::clone(options)),
            OptionsSource::Derived(f) => match f(event, context).await {
                Ok(options) => Ok(Arc::new(options)),
                Err(e) => {
                    let body = serde_json::json!({
                        "errors": [{
                            "message": format!("Invalid options provided to the query engine: {e}")
                        }]
                    });
                    Err(HttpQueryError::graphql(500, body.to_string()).into())
                }
            },
        }
    }
}
