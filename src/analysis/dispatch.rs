// Virtual dispatch resolution
//
// Adds the edges that depend on the class hierarchy as a whole rather than on
// a single class's bytecode: call-site dispatch, overrides of kept
// declarations, interface chains and library overrides. All of these are
// recomputed from scratch whenever the hierarchy may have changed.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use super::ShrinkerWarning;
use crate::classfile::{InvokeKind, MemberRef};
use crate::graph::{Dependency, DependencyKind, Resolution, ShrinkerGraph, Symbol};

/// A virtual or interface invocation found in a program method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite<T> {
    pub caller: T,
    pub kind: InvokeKind,
    pub target: MemberRef,
}

#[derive(Debug, Default)]
pub struct DispatchOutcome {
    pub call_sites: usize,
    pub dependencies_added: usize,
    pub warnings: Vec<ShrinkerWarning>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DispatchResolver;

struct Plan<T> {
    dependencies: Vec<(T, T, Dependency<T>)>,
    warnings: Vec<ShrinkerWarning>,
    reported: HashSet<(String, String)>,
}

impl<T: Symbol> Plan<T> {
    fn new() -> Self {
        Self {
            dependencies: Vec::new(),
            warnings: Vec::new(),
            reported: HashSet::new(),
        }
    }

    fn unconditional(&mut self, from: &T, to: T, kind: DependencyKind) {
        self.dependencies
            .push((from.clone(), to, Dependency::new(kind).from_dispatch()));
    }

    fn conditional(&mut self, from: &T, to: T, kind: DependencyKind, condition: &T) {
        self.dependencies
            .push((from.clone(), to, Dependency::conditional(kind, condition.clone())));
    }

    fn warn(&mut self, warning: ShrinkerWarning) {
        let key = (warning.symbol.clone(), warning.origin.clone().unwrap_or_default());
        if self.reported.insert(key) {
            self.warnings.push(warning);
        }
    }
}

impl DispatchResolver {
    pub fn new() -> Self {
        Self
    }

    /// All dispatched call sites in program code, in class and member order
    pub fn call_sites<T: Symbol>(&self, graph: &ShrinkerGraph<T>) -> Vec<CallSite<T>> {
        let mut sites = Vec::new();
        for class in graph.program_classes() {
            for member in graph.members_of(class) {
                for (kind, target) in member.dispatched_calls() {
                    sites.push(CallSite {
                        caller: member.symbol.clone(),
                        kind,
                        target: target.clone(),
                    });
                }
            }
        }
        sites
    }

    /// Replace every dispatch edge in the graph with a freshly computed set
    pub fn resolve<T: Symbol>(&self, graph: &mut ShrinkerGraph<T>) -> DispatchOutcome {
        graph.clear_dispatch_dependencies();

        let call_sites = self.call_sites(graph);
        let mut plan = Plan::new();
        let mut closures: HashMap<String, Vec<T>> = HashMap::new();

        for site in &call_sites {
            self.plan_call_site(graph, site, &mut closures, &mut plan);
        }
        self.plan_overrides(graph, &mut plan);
        self.plan_interface_chains(graph, &mut plan);
        self.plan_library_overrides(graph, &mut plan);

        let mut added = 0;
        for (from, to, dependency) in plan.dependencies {
            if graph.add_dependency(&from, &to, dependency) {
                added += 1;
            }
        }

        info!(
            "Resolved {} call sites, {} dispatch edges",
            call_sites.len(),
            added
        );

        DispatchOutcome {
            call_sites: call_sites.len(),
            dependencies_added: added,
            warnings: plan.warnings,
        }
    }

    fn plan_call_site<T: Symbol>(
        &self,
        graph: &ShrinkerGraph<T>,
        site: &CallSite<T>,
        closures: &mut HashMap<String, Vec<T>>,
        plan: &mut Plan<T>,
    ) {
        let target = &site.target;
        // Methods on arrays are Object's
        if target.owner.starts_with('[') {
            return;
        }

        match graph.resolve_class(&target.owner) {
            // Library receivers: overriding program methods are kept by the library-override rule
            Resolution::Library => return,
            Resolution::Program(_) => {
                match graph.resolve_method(&target.owner, &target.name, &target.descriptor) {
                    Resolution::Program(declaration) => {
                        plan.unconditional(&site.caller, declaration, DependencyKind::RequiresMember);
                    }
                    Resolution::Library => {}
                    Resolution::Unknown(missing) => {
                        plan.warn(ShrinkerWarning::unresolved(missing, site.caller.to_string()));
                    }
                }
            }
            Resolution::Unknown(missing) => {
                debug!("Unknown receiver {}, dispatching to classes that name it", missing);
                plan.warn(
                    ShrinkerWarning::unresolved(missing, site.caller.to_string())
                        .with_message("unknown receiver type; dispatching to its known subtypes"),
                );
            }
        }

        let receiver = T::for_class(&target.owner);
        let candidates = closures
            .entry(target.owner.clone())
            .or_insert_with(|| graph.subtypes_closure(&receiver));

        for candidate in candidates.iter() {
            let Some(class) = graph.class(candidate) else {
                continue;
            };
            if !class.is_program() || class.is_interface() {
                continue;
            }
            if let Some(implementation) =
                graph.find_implementation(candidate, &target.name, &target.descriptor)
            {
                plan.conditional(
                    &site.caller,
                    implementation,
                    DependencyKind::MemberImplementedIfClassKept,
                    candidate,
                );
            }
        }
    }

    /// A kept declaration keeps each override visible from a kept subclass
    fn plan_overrides<T: Symbol>(&self, graph: &ShrinkerGraph<T>, plan: &mut Plan<T>) {
        for class in graph.program_classes() {
            let declarations: Vec<_> = graph.members_of(class).filter(|m| m.is_virtual()).collect();
            if declarations.is_empty() {
                continue;
            }
            for subtype in graph.subtypes_closure(&class.symbol).iter().skip(1) {
                let Some(sub) = graph.class(subtype) else {
                    continue;
                };
                if !sub.is_program() || sub.is_interface() {
                    continue;
                }
                for declaration in &declarations {
                    let Some(implementation) =
                        graph.find_implementation(subtype, &declaration.name, &declaration.descriptor)
                    else {
                        continue;
                    };
                    if implementation != declaration.symbol {
                        plan.conditional(
                            &declaration.symbol,
                            implementation,
                            DependencyKind::MemberImplementedIfClassKept,
                            subtype,
                        );
                    }
                }
            }
        }
    }

    /// A kept superinterface keeps the subinterface through which a kept class implements it
    fn plan_interface_chains<T: Symbol>(&self, graph: &ShrinkerGraph<T>, plan: &mut Plan<T>) {
        for interface in graph.program_classes().filter(|c| c.is_interface()) {
            let parents: Vec<&T> = interface
                .interfaces
                .iter()
                .filter(|i| graph.class(i).map(|c| c.is_program()).unwrap_or(false))
                .collect();
            if parents.is_empty() {
                continue;
            }
            for implementer in graph.subtypes_closure(&interface.symbol).iter().skip(1) {
                let is_class = graph
                    .class(implementer)
                    .map(|c| c.is_program() && !c.is_interface())
                    .unwrap_or(false);
                if !is_class {
                    continue;
                }
                for parent in &parents {
                    plan.conditional(
                        parent,
                        interface.symbol.clone(),
                        DependencyKind::InterfaceImplementedIfClassKept,
                        implementer,
                    );
                }
            }
        }
    }

    /// Methods overriding a library declaration can be called by library code,
    /// so they live as long as their class. Classes with a missing ancestor
    /// keep all their overridable methods.
    fn plan_library_overrides<T: Symbol>(&self, graph: &ShrinkerGraph<T>, plan: &mut Plan<T>) {
        for class in graph.program_classes() {
            let ancestry = graph.ancestry(class);
            if ancestry.library.is_empty() && !ancestry.has_unknown {
                continue;
            }
            for member in graph.members_of(class).filter(|m| m.is_virtual()) {
                if ancestry.has_unknown
                    || graph.library_declares(&ancestry.library, &member.name, &member.descriptor)
                {
                    plan.unconditional(&class.symbol, member.symbol.clone(), DependencyKind::RequiresMember);
                }
            }
        }
    }
}
