use halcyon_model::gateway::Event;
use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A registered handler: takes the dispatched event and returns the future
/// that runs it.
pub type Handler = Arc<dyn Fn(Arc<Event>) -> BoxFuture + Send + Sync>;

/// Maps event names to the ordered list of handlers registered for them.
///
/// Immutable once built: registration must complete before a
/// [`Dispatcher`](crate::Dispatcher) starts dispatching, so there's no
/// interior mutability or locking here.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<&'static str, Vec<Handler>>,
}

impl HandlerRegistry {
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    pub fn handlers(&self, event_name: &str) -> Option<&[Handler]> {
        self.handlers.get(event_name).map(Vec::as_slice)
    }
}

/// Builds a [`HandlerRegistry`].
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    handlers: HashMap<&'static str, Vec<Handler>>,
}

impl HandlerRegistryBuilder {
    /// Registers a handler for an event name (e.g. `"MESSAGE_CREATE"`).
    /// Multiple handlers may share the same event name; they run in
    /// registration order.
    #[must_use]
    pub fn on<F, Fut>(mut self, event_name: &'static str, handler: F) -> Self
    where
        F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |event| Box::pin(handler(event)));
        self.handlers.entry(event_name).or_default().push(handler);
        self
    }

    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry { handlers: self.handlers }
    }
}

#[cfg(test)]
mod tests {
    use super::HandlerRegistry;
    use halcyon_model::gateway::Event;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn handlers_run_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&order);
        let second = Arc::clone(&order);

        let registry = HandlerRegistry::builder()
            .on("MESSAGE_CREATE", move |_event: Arc<Event>| {
                let first = Arc::clone(&first);
                async move { first.lock().unwrap().push(1) }
            })
            .on("MESSAGE_CREATE", move |_event: Arc<Event>| {
                let second = Arc::clone(&second);
                async move { second.lock().unwrap().push(2) }
            })
            .build();

        let handlers = registry.handlers("MESSAGE_CREATE").unwrap();
        assert_eq!(handlers.len(), 2);

        let raw = serde_json::value::RawValue::from_string(
            r#"{"id":"1","channel_id":"2","author":{"id":"3","username":"a","discriminator":"0001"},"content":""}"#.to_owned(),
        )
        .unwrap();
        let event = Arc::new(Event::from_raw("MESSAGE_CREATE", &raw).unwrap().unwrap());

        for handler in handlers {
            handler(Arc::clone(&event)).await;
        }

        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn unregistered_event_name_has_no_handlers() {
        let registry = HandlerRegistry::builder().build();
        assert!(registry.handlers("MESSAGE_CREATE").is_none());
    }
}
