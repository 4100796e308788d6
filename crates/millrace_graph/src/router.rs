//! Validated element graphs and the run loop.
//!
//! A [`RouterBuilder`] collects named elements and port-to-port links,
//! then `build` validates the wiring: names resolve, port counts fit the
//! declarations, disciplines agree (with agnostic resolution), every
//! actual port is connected, configuration succeeds, and each element's
//! declared capabilities match what it registered. A [`Router`] that made
//! it through `build` never fails structurally at runtime.
//!
//! One router instance is one logical thread: all push and pull calls and
//! all task and timer firings execute strictly sequentially, run to
//! completion. Cross-router traffic goes through explicit hand-off
//! elements, never shared mutable state.

use crate::element::{Element, Processing};
use indexmap::IndexMap;
use millrace_core::{Capability, ConfigArg, CoreError, CoreResult, Duration, Errors, Timestamp};
use millrace_packet::Packet;
use millrace_runtime::{Scheduler, TaskId, TimerError, TimerId, TimerQueue};
use std::cell::RefCell;
use std::fmt;

/// Build-time graph validation failure. The graph refuses to start.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// Two elements were added under the same name
    #[error("duplicate element name: {0}")]
    DuplicateName(String),

    /// A link references an element name that was never added
    #[error("unknown element in link: {0}")]
    UnknownElement(String),

    /// The wired port count falls outside the element's declaration
    #[error("{element}: {count} {direction} port(s) not allowed by declaration")]
    PortCount {
        /// Element name
        element: String,
        /// "input" or "output"
        direction: &'static str,
        /// Actual wired count
        count: usize,
    },

    /// An actual port has no link
    #[error("{element}: {direction} port {port} is not connected")]
    PortUnconnected {
        /// Element name
        element: String,
        /// "input" or "output"
        direction: &'static str,
        /// Port index
        port: usize,
    },

    /// A push output or a pull input has more than one link
    #[error("{element}: {direction} port {port} has multiple links")]
    MultipleLinks {
        /// Element name
        element: String,
        /// "input" or "output"
        direction: &'static str,
        /// Port index
        port: usize,
    },

    /// A push side is wired to a pull side
    #[error("discipline conflict on link {from}[{from_port}] -> [{to_port}]{to}")]
    DisciplineConflict {
        /// Upstream element name
        from: String,
        /// Upstream output port
        from_port: usize,
        /// Downstream element name
        to: String,
        /// Downstream input port
        to_port: usize,
    },

    /// One or more elements rejected their configuration
    #[error("configuration failed: {}", messages.join("; "))]
    Configure {
        /// One message per recorded error, with element context
        messages: Vec<String>,
    },

    /// An element failed to initialize
    #[error("{element} failed to initialize: {reason}")]
    Initialize {
        /// Element name
        element: String,
        /// Human-readable reason
        reason: String,
    },

    /// Declared capabilities disagree with what initialize registered
    #[error("{element}: {reason}")]
    Capability {
        /// Element name
        element: String,
        /// Human-readable reason
        reason: String,
    },
}

/// Handle for registering tasks and timers during element initialization
pub struct InitContext<'a> {
    scheduler: &'a mut Scheduler,
    timers: &'a mut TimerQueue,
    registered_tasks: Vec<TaskId>,
    registered_timers: Vec<TimerId>,
    now: Timestamp,
}

impl InitContext<'_> {
    /// Time the graph is being built at
    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Join the scheduler with a new, initially-enabled task
    pub fn register_task(&mut self) -> TaskId {
        let id = self.scheduler.insert();
        self.registered_tasks.push(id);
        id
    }

    /// Register a new, unarmed timer
    pub fn register_timer(&mut self) -> TimerId {
        let id = self.timers.register();
        self.registered_timers.push(id);
        id
    }

    /// Arm a timer for an absolute deadline
    pub fn schedule_timer_at(
        &mut self,
        timer: TimerId,
        deadline: Timestamp,
    ) -> Result<(), TimerError> {
        self.timers.schedule_at(timer, deadline)
    }

    /// Arm a timer relative to build time
    pub fn schedule_timer_after(
        &mut self,
        timer: TimerId,
        after: Duration,
    ) -> Result<(), TimerError> {
        self.timers.schedule_after(timer, self.now, after)
    }
}

/// Per-invocation handle an element uses to reach its neighbors and the
/// runtime.
///
/// Created by the router for every push, pull, task, or timer invocation;
/// carries the current time and the identity of the invoked element.
pub struct Context<'r> {
    router: &'r Router,
    element: usize,
    now: Timestamp,
}

impl Context<'_> {
    /// Current time for this invocation
    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Name of the invoked element
    #[must_use]
    pub fn element_name(&self) -> &str {
        &self.router.names[self.element]
    }

    /// Actual input port count of the invoked element
    #[must_use]
    pub fn inputs(&self) -> usize {
        self.router.pull_sources[self.element].len()
    }

    /// Actual output port count of the invoked element
    #[must_use]
    pub fn outputs(&self) -> usize {
        self.router.push_targets[self.element].len()
    }

    /// Push a packet out of output `port`. Synchronous; ownership
    /// transfers to the downstream element before this returns.
    ///
    /// A push to an unwired output (a diagnostic path nothing consumes)
    /// drops the packet silently.
    pub fn push(&self, port: usize, packet: Packet) {
        match self.router.push_targets[self.element]
            .get(port)
            .copied()
            .flatten()
        {
            Some((to, to_port)) => {
                let ctx = Context {
                    router: self.router,
                    element: to,
                    now: self.now,
                };
                self.router.elements[to].borrow_mut().push(to_port, packet, &ctx);
            }
            None => {
                tracing::debug!(
                    element = %self.router.names[self.element],
                    port,
                    "push to unwired output, dropping packet"
                );
            }
        }
    }

    /// Pull a packet through input `port`. `None` means nothing is
    /// currently available; the caller stays scheduled and retries later.
    #[must_use]
    pub fn pull(&self, port: usize) -> Option<Packet> {
        let (from, from_port) = self.router.pull_sources[self.element]
            .get(port)
            .copied()
            .flatten()?;
        let ctx = Context {
            router: self.router,
            element: from,
            now: self.now,
        };
        let packet = self.router.elements[from].borrow_mut().pull(from_port, &ctx);
        packet
    }

    /// Re-queue the currently running task for a near-immediate revisit
    pub fn fast_reschedule(&self, task: TaskId) {
        self.router.scheduler.borrow_mut().fast_reschedule(task);
    }

    /// Re-enable and queue an idle or unscheduled task
    pub fn reschedule(&self, task: TaskId) {
        self.router.scheduler.borrow_mut().reschedule(task);
    }

    /// Disable a task; safe and idempotent from inside the task itself
    pub fn unschedule_task(&self, task: TaskId) {
        self.router.scheduler.borrow_mut().unschedule(task);
    }

    /// Arm a timer for an absolute deadline
    pub fn schedule_timer_at(
        &self,
        timer: TimerId,
        deadline: Timestamp,
    ) -> Result<(), TimerError> {
        self.router.timers.borrow_mut().schedule_at(timer, deadline)
    }

    /// Arm a timer relative to the current invocation time
    pub fn schedule_timer_after(&self, timer: TimerId, after: Duration) -> Result<(), TimerError> {
        self.router
            .timers
            .borrow_mut()
            .schedule_after(timer, self.now, after)
    }

    /// Disarm a timer; safe and idempotent from inside its own firing
    pub fn unschedule_timer(&self, timer: TimerId) {
        self.router.timers.borrow_mut().unschedule(timer);
    }
}

struct LinkDef {
    from: String,
    from_port: usize,
    to: String,
    to_port: usize,
}

/// Collects elements and links, then validates them into a [`Router`]
pub struct RouterBuilder {
    elements: Vec<(String, Box<dyn Element>, Vec<ConfigArg>)>,
    by_name: IndexMap<String, usize>,
    duplicates: Vec<String>,
    links: Vec<LinkDef>,
}

impl RouterBuilder {
    /// Start an empty graph
    #[must_use]
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            by_name: IndexMap::new(),
            duplicates: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Add a named element with its configuration arguments
    #[must_use]
    pub fn add(
        mut self,
        name: impl Into<String>,
        element: Box<dyn Element>,
        args: Vec<ConfigArg>,
    ) -> Self {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            self.duplicates.push(name);
            return self;
        }
        self.by_name.insert(name.clone(), self.elements.len());
        self.elements.push((name, element, args));
        self
    }

    /// Link `from`'s output `from_port` to `to`'s input `to_port`
    #[must_use]
    pub fn connect(
        mut self,
        from: impl Into<String>,
        from_port: usize,
        to: impl Into<String>,
        to_port: usize,
    ) -> Self {
        self.links.push(LinkDef {
            from: from.into(),
            from_port,
            to: to.into(),
            to_port,
        });
        self
    }

    /// Validate the graph, configure and initialize every element.
    ///
    /// Any recorded configuration error refuses to start the graph.
    pub fn build(mut self, now: Timestamp) -> Result<Router, BuildError> {
        if let Some(name) = self.duplicates.first() {
            return Err(BuildError::DuplicateName(name.clone()));
        }

        // resolve link endpoints
        let mut links = Vec::with_capacity(self.links.len());
        for def in &self.links {
            let from = *self
                .by_name
                .get(&def.from)
                .ok_or_else(|| BuildError::UnknownElement(def.from.clone()))?;
            let to = *self
                .by_name
                .get(&def.to)
                .ok_or_else(|| BuildError::UnknownElement(def.to.clone()))?;
            links.push((from, def.from_port, to, def.to_port));
        }

        // actual port counts: the declared minimum or the highest wired
        // index plus one, whichever is larger
        let count = self.elements.len();
        let mut n_in = vec![0usize; count];
        let mut n_out = vec![0usize; count];
        for (i, (_, element, _)) in self.elements.iter().enumerate() {
            let ports = element.ports();
            n_in[i] = ports.inputs.min();
            n_out[i] = ports.outputs.min();
        }
        for &(from, from_port, to, to_port) in &links {
            n_out[from] = n_out[from].max(from_port + 1);
            n_in[to] = n_in[to].max(to_port + 1);
        }
        for (i, (name, element, _)) in self.elements.iter().enumerate() {
            let ports = element.ports();
            if !ports.inputs.allows(n_in[i]) {
                return Err(BuildError::PortCount {
                    element: name.clone(),
                    direction: "input",
                    count: n_in[i],
                });
            }
            if !ports.outputs.allows(n_out[i]) {
                return Err(BuildError::PortCount {
                    element: name.clone(),
                    direction: "output",
                    count: n_out[i],
                });
            }
        }

        let disciplines = self.resolve_disciplines(&links)?;

        // multiplicity and connectedness per actual port
        let mut out_links: Vec<Vec<usize>> = n_out.iter().map(|&n| vec![0; n]).collect();
        let mut in_links: Vec<Vec<usize>> = n_in.iter().map(|&n| vec![0; n]).collect();
        for &(from, from_port, to, to_port) in &links {
            out_links[from][from_port] += 1;
            in_links[to][to_port] += 1;
        }
        for (i, (name, _, _)) in self.elements.iter().enumerate() {
            for (port, &wired) in out_links[i].iter().enumerate() {
                if wired == 0 {
                    return Err(BuildError::PortUnconnected {
                        element: name.clone(),
                        direction: "output",
                        port,
                    });
                }
                if wired > 1 && disciplines[i].output == Some(Mode::Push) {
                    return Err(BuildError::MultipleLinks {
                        element: name.clone(),
                        direction: "output",
                        port,
                    });
                }
            }
            for (port, &wired) in in_links[i].iter().enumerate() {
                if wired == 0 {
                    return Err(BuildError::PortUnconnected {
                        element: name.clone(),
                        direction: "input",
                        port,
                    });
                }
                if wired > 1 && disciplines[i].input == Some(Mode::Pull) {
                    return Err(BuildError::MultipleLinks {
                        element: name.clone(),
                        direction: "input",
                        port,
                    });
                }
            }
        }

        // configure every element; collect all errors before refusing
        let mut messages = Vec::new();
        for (name, element, args) in &mut self.elements {
            let mut errh = Errors::new(name.as_str());
            if let Err(err) = element.configure(args, &mut errh) {
                if errh.error_count() == 0 {
                    messages.push(format!("{name}: {err}"));
                }
            }
            for message in errh.messages() {
                messages.push(format!("{name}: {message}"));
            }
        }
        if !messages.is_empty() {
            return Err(BuildError::Configure { messages });
        }

        // initialize: register tasks and timers, check capabilities
        let mut scheduler = Scheduler::new();
        let mut timers = TimerQueue::new();
        let mut task_owner = IndexMap::new();
        let mut timer_owner = IndexMap::new();
        for (i, (name, element, _)) in self.elements.iter_mut().enumerate() {
            let mut ictx = InitContext {
                scheduler: &mut scheduler,
                timers: &mut timers,
                registered_tasks: Vec::new(),
                registered_timers: Vec::new(),
                now,
            };
            element
                .initialize(&mut ictx)
                .map_err(|err| BuildError::Initialize {
                    element: name.clone(),
                    reason: err.to_string(),
                })?;

            let capabilities = element.capabilities();
            let scheduled = capabilities.has(Capability::Scheduled);
            if scheduled != !ictx.registered_tasks.is_empty() {
                return Err(BuildError::Capability {
                    element: name.clone(),
                    reason: if scheduled {
                        "declares Scheduled but registered no task".to_string()
                    } else {
                        "registered a task without declaring Scheduled".to_string()
                    },
                });
            }
            let timed = capabilities.has(Capability::Timed);
            if timed != !ictx.registered_timers.is_empty() {
                return Err(BuildError::Capability {
                    element: name.clone(),
                    reason: if timed {
                        "declares Timed but registered no timer".to_string()
                    } else {
                        "registered a timer without declaring Timed".to_string()
                    },
                });
            }

            for id in ictx.registered_tasks {
                task_owner.insert(id, i);
            }
            for id in ictx.registered_timers {
                timer_owner.insert(id, i);
            }
        }

        // wiring tables used at runtime
        let mut push_targets: Vec<Vec<Option<(usize, usize)>>> = Vec::with_capacity(count);
        let mut pull_sources: Vec<Vec<Option<(usize, usize)>>> = Vec::with_capacity(count);
        for i in 0..count {
            push_targets.push(vec![None; n_out[i]]);
            pull_sources.push(vec![None; n_in[i]]);
        }
        for &(from, from_port, to, to_port) in &links {
            match disciplines[from].output {
                Some(Mode::Push) => push_targets[from][from_port] = Some((to, to_port)),
                _ => pull_sources[to][to_port] = Some((from, from_port)),
            }
        }

        let mut names = Vec::with_capacity(count);
        let mut elements = Vec::with_capacity(count);
        for (name, element, _) in self.elements {
            names.push(name);
            elements.push(RefCell::new(element));
        }
        tracing::info!(
            elements = count,
            links = links.len(),
            tasks = task_owner.len(),
            timers = timer_owner.len(),
            "router built"
        );

        Ok(Router {
            names,
            by_name: self.by_name,
            elements,
            push_targets,
            pull_sources,
            scheduler: RefCell::new(scheduler),
            timers: RefCell::new(timers),
            task_owner,
            timer_owner,
        })
    }

    /// Resolve agnostic port disciplines by fixpoint propagation along
    /// the links. Elements declaring Agnostic on both sides tie them
    /// together so the discipline flows through. Unresolved ports
    /// default to push.
    fn resolve_disciplines(
        &self,
        links: &[(usize, usize, usize, usize)],
    ) -> Result<Vec<Discipline>, BuildError> {
        let mut disciplines: Vec<Discipline> = self
            .elements
            .iter()
            .map(|(_, element, _)| {
                let ports = element.ports();
                Discipline {
                    input: Mode::from_processing(ports.input_processing),
                    output: Mode::from_processing(ports.output_processing),
                    tied: ports.input_processing == Processing::Agnostic
                        && ports.output_processing == Processing::Agnostic,
                }
            })
            .collect();

        let mut changed = true;
        while changed {
            changed = false;
            for &(from, from_port, to, to_port) in links {
                match (disciplines[from].output, disciplines[to].input) {
                    (Some(a), Some(b)) if a != b => {
                        return Err(BuildError::DisciplineConflict {
                            from: self.elements[from].0.clone(),
                            from_port,
                            to: self.elements[to].0.clone(),
                            to_port,
                        });
                    }
                    (Some(mode), None) => {
                        disciplines[to].set_input(mode);
                        changed = true;
                    }
                    (None, Some(mode)) => {
                        disciplines[from].set_output(mode);
                        changed = true;
                    }
                    _ => {}
                }
            }
        }
        for discipline in &mut disciplines {
            if discipline.input.is_none() {
                discipline.set_input(Mode::Push);
            }
            if discipline.output.is_none() {
                discipline.set_output(Mode::Push);
            }
        }
        Ok(disciplines)
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Push,
    Pull,
}

impl Mode {
    fn from_processing(processing: Processing) -> Option<Mode> {
        match processing {
            Processing::Push => Some(Mode::Push),
            Processing::Pull => Some(Mode::Pull),
            Processing::Agnostic => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Discipline {
    input: Option<Mode>,
    output: Option<Mode>,
    tied: bool,
}

impl Discipline {
    fn set_input(&mut self, mode: Mode) {
        self.input = Some(mode);
        if self.tied {
            self.output = Some(mode);
        }
    }

    fn set_output(&mut self, mode: Mode) {
        self.output = Some(mode);
        if self.tied {
            self.input = Some(mode);
        }
    }
}

/// A validated, running element graph.
///
/// Owns every element, the scheduler, and the timer queue. Driven by
/// explicit timestamps so tests are deterministic; deployments pass
/// `Timestamp::now()`.
pub struct Router {
    names: Vec<String>,
    by_name: IndexMap<String, usize>,
    elements: Vec<RefCell<Box<dyn Element>>>,
    push_targets: Vec<Vec<Option<(usize, usize)>>>,
    pull_sources: Vec<Vec<Option<(usize, usize)>>>,
    scheduler: RefCell<Scheduler>,
    timers: RefCell<TimerQueue>,
    task_owner: IndexMap<TaskId, usize>,
    timer_owner: IndexMap<TimerId, usize>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("elements", &self.names)
            .field("tasks", &self.task_owner.len())
            .field("timers", &self.timer_owner.len())
            .finish_non_exhaustive()
    }
}

impl Router {
    /// Number of elements in the graph
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Element names in insertion order
    pub fn element_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Number of tasks registered with the scheduler
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.scheduler.borrow().task_count()
    }

    /// Number of tasks currently queued to run
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.borrow().pending()
    }

    /// Number of armed timers
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().pending_count()
    }

    /// Earliest armed deadline, if any
    #[must_use]
    pub fn next_timer_deadline(&self) -> Option<Timestamp> {
        self.timers.borrow().next_deadline()
    }

    /// Fire every timer whose deadline has passed, in deadline order with
    /// ties broken by arming order. Returns how many fired.
    pub fn run_timers(&self, now: Timestamp) -> usize {
        let fired = self.timers.borrow_mut().expire(now);
        for &id in &fired {
            if let Some(&owner) = self.timer_owner.get(&id) {
                let ctx = Context {
                    router: self,
                    element: owner,
                    now,
                };
                self.elements[owner].borrow_mut().run_timer(id, &ctx);
            }
        }
        fired.len()
    }

    /// Run the next queued task to completion. Returns whether it
    /// reported useful work. A task that wants to keep running re-queues
    /// itself; nothing is requeued automatically.
    pub fn run_task(&self, now: Timestamp) -> bool {
        let next = self.scheduler.borrow_mut().next();
        match next {
            Some(id) => self.run_one(id, now),
            None => false,
        }
    }

    /// One scheduling pass: expired timers first, then up to `budget`
    /// queued tasks. Returns the number of tasks run.
    pub fn process(&self, now: Timestamp, budget: usize) -> usize {
        self.run_timers(now);
        let mut ran = 0;
        for _ in 0..budget {
            let next = self.scheduler.borrow_mut().next();
            let Some(id) = next else { break };
            self.run_one(id, now);
            ran += 1;
        }
        ran
    }

    fn run_one(&self, id: TaskId, now: Timestamp) -> bool {
        let Some(&owner) = self.task_owner.get(&id) else {
            return false;
        };
        let ctx = Context {
            router: self,
            element: owner,
            now,
        };
        self.elements[owner].borrow_mut().run_task(id, &ctx)
    }

    /// Read a named handler, addressed as `"element.handler"`
    pub fn handler_read(&self, path: &str) -> CoreResult<String> {
        let (element, handler) = self.resolve_handler(path)?;
        self.elements[element]
            .borrow()
            .read_handler(handler)
            .ok_or_else(|| CoreError::NoSuchHandler(path.to_string()))
    }

    /// Write a named handler, addressed as `"element.handler"`
    pub fn handler_write(&self, path: &str, value: &str, now: Timestamp) -> CoreResult<()> {
        let (element, handler) = self.resolve_handler(path)?;
        self.elements[element]
            .borrow_mut()
            .write_handler(handler, value, now)
    }

    fn resolve_handler<'p>(&self, path: &'p str) -> CoreResult<(usize, &'p str)> {
        let (name, handler) = path.split_once('.').ok_or_else(|| CoreError::Parse {
            message: format!("handler path '{path}': expected element.handler"),
        })?;
        let element = *self.by_name.get(name).ok_or_else(|| CoreError::NotFound {
            kind: "element".to_string(),
            id: name.to_string(),
        })?;
        Ok((element, handler))
    }
}
