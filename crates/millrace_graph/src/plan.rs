//! Typed router descriptions and the element class registry.
//!
//! The configuration-language front end is out of scope; what it produces
//! is a [`RouterPlan`]: named element instances with typed arguments plus
//! port-to-port links. Plans are serde types, so a graph description can
//! arrive as JSON. A [`Registry`] maps class names to constructors and
//! turns a plan into a validated [`Router`].

use crate::element::Element;
use crate::router::{BuildError, Router, RouterBuilder};
use indexmap::IndexMap;
use millrace_core::{ConfigArg, CoreError, CoreResult, Timestamp};
use serde::{Deserialize, Serialize};

/// One element instance in a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementPlan {
    /// Instance name, unique within the plan
    pub name: String,
    /// Element class, resolved through the registry
    pub class: String,
    /// Typed configuration arguments
    #[serde(default)]
    pub args: Vec<ConfigArg>,
}

/// One port-to-port link in a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkPlan {
    /// Upstream element name
    pub from: String,
    /// Upstream output port
    #[serde(default)]
    pub from_port: usize,
    /// Downstream element name
    pub to: String,
    /// Downstream input port
    #[serde(default)]
    pub to_port: usize,
}

/// A complete graph description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterPlan {
    /// Element instances
    pub elements: Vec<ElementPlan>,
    /// Links between them
    pub links: Vec<LinkPlan>,
}

type Constructor = fn() -> Box<dyn Element>;

/// Maps element class names to constructors
#[derive(Default)]
pub struct Registry {
    constructors: IndexMap<String, Constructor>,
}

impl Registry {
    /// An empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            constructors: IndexMap::new(),
        }
    }

    /// Register a class; a later registration under the same name wins
    pub fn register(&mut self, class: impl Into<String>, constructor: Constructor) {
        self.constructors.insert(class.into(), constructor);
    }

    /// Whether a class name is registered
    #[must_use]
    pub fn contains(&self, class: &str) -> bool {
        self.constructors.contains_key(class)
    }

    /// Registered class names in registration order
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Construct a fresh instance of a class
    pub fn instantiate(&self, class: &str) -> CoreResult<Box<dyn Element>> {
        match self.constructors.get(class) {
            Some(constructor) => Ok(constructor()),
            None => Err(CoreError::NotFound {
                kind: "element class".to_string(),
                id: class.to_string(),
            }),
        }
    }

    /// Instantiate and wire a plan into a validated router
    pub fn build(&self, plan: &RouterPlan, now: Timestamp) -> Result<Router, BuildError> {
        let mut builder = RouterBuilder::new();
        for element in &plan.elements {
            let instance = self
                .instantiate(&element.class)
                .map_err(|_| BuildError::UnknownElement(element.class.clone()))?;
            builder = builder.add(element.name.clone(), instance, element.args.clone());
        }
        for link in &plan.links {
            builder = builder.connect(&*link.from, link.from_port, &*link.to, link.to_port);
        }
        builder.build(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{PortSpec, Processing};
    use crate::router::Context;
    use millrace_core::{Args, CapabilitySet, Capability, CoreResult, Errors};
    use millrace_packet::Packet;

    /// Sink that remembers how many packets to expect, from its args.
    struct PlanSink {
        expected: u64,
        seen: u64,
    }

    impl Element for PlanSink {
        fn class_name(&self) -> &'static str {
            "PlanSink"
        }

        fn ports(&self) -> PortSpec {
            PortSpec::sink(1, Processing::Push)
        }

        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::new().with(Capability::Push)
        }

        fn configure(&mut self, args: &[ConfigArg], errh: &mut Errors) -> CoreResult<()> {
            let mut args = Args::new(args);
            self.expected = args.unsigned("expected count").map_err(|e| errh.error(e.to_string()))?;
            args.finish().map_err(|e| errh.error(e.to_string()))
        }

        fn push(&mut self, _port: usize, packet: Packet, _ctx: &Context<'_>) {
            self.seen += 1;
            drop(packet);
        }

        fn read_handler(&self, name: &str) -> Option<String> {
            match name {
                "expected" => Some(self.expected.to_string()),
                "seen" => Some(self.seen.to_string()),
                _ => None,
            }
        }
    }

    /// Idle source so the sink has an upstream.
    struct PlanIdle;

    impl Element for PlanIdle {
        fn class_name(&self) -> &'static str {
            "PlanIdle"
        }

        fn ports(&self) -> PortSpec {
            PortSpec::source(1, Processing::Push)
        }

        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::new().with(Capability::Push)
        }
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register("PlanSink", || {
            Box::new(PlanSink {
                expected: 0,
                seen: 0,
            })
        });
        registry.register("PlanIdle", || Box::new(PlanIdle));
        registry
    }

    #[test]
    fn test_plan_from_json_builds() {
        let json = r#"{
            "elements": [
                {"name": "src", "class": "PlanIdle"},
                {"name": "sink", "class": "PlanSink", "args": [{"Unsigned": 7}]}
            ],
            "links": [
                {"from": "src", "to": "sink"}
            ]
        }"#;
        let plan: RouterPlan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.elements.len(), 2);
        assert_eq!(plan.links[0].from_port, 0);

        let router = registry().build(&plan, Timestamp::from_millis(0)).unwrap();
        assert_eq!(router.element_count(), 2);
        assert_eq!(router.handler_read("sink.expected").unwrap(), "7");
    }

    #[test]
    fn test_unknown_class_rejected() {
        let plan = RouterPlan {
            elements: vec![ElementPlan {
                name: "x".to_string(),
                class: "NoSuchClass".to_string(),
                args: vec![],
            }],
            links: vec![],
        };
        let err = registry().build(&plan, Timestamp::from_millis(0)).unwrap_err();
        assert_eq!(err, BuildError::UnknownElement("NoSuchClass".to_string()));
    }

    #[test]
    fn test_registry_introspection() {
        let registry = registry();
        assert!(registry.contains("PlanSink"));
        assert!(!registry.contains("Queue"));
        let classes: Vec<&str> = registry.classes().collect();
        assert_eq!(classes, vec!["PlanSink", "PlanIdle"]);
        assert!(registry.instantiate("Queue").is_err());
    }

    #[test]
    fn test_plan_round_trip() {
        let plan = RouterPlan {
            elements: vec![ElementPlan {
                name: "sink".to_string(),
                class: "PlanSink".to_string(),
                args: vec![ConfigArg::Unsigned(3)],
            }],
            links: vec![LinkPlan {
                from: "a".to_string(),
                from_port: 1,
                to: "b".to_string(),
                to_port: 0,
            }],
        };
        let json = serde_json::to_string(&plan).unwrap();
        let back: RouterPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(plan, back);
    }
}
