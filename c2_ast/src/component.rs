use crate::Symbol;
use std::fmt::Display;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ComponentId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentKind {
    Executable,
    SharedLib,
    StaticLib,
    CLib,
}

impl Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Executable => write!(f, "executable"),
            Self::SharedLib => write!(f, "shared-lib"),
            Self::StaticLib => write!(f, "static-lib"),
            Self::CLib => write!(f, "c-lib"),
        }
    }
}

/// A unit of linkage: the main executable/library of a build, or an external
/// library discovered on the search path. Dependency edges are typed by the
/// kind of the component being used.
pub struct Component<'ctx> {
    pub name: Symbol<'ctx>,
    pub kind: ComponentKind,
    /// On-disk location for external components.
    pub path: Option<PathBuf>,
    pub is_main: bool,
    modules: Vec<Symbol<'ctx>>,
    deps: Vec<(ComponentId, ComponentKind)>,
}

impl<'ctx> Component<'ctx> {
    pub fn add_module(&mut self, module: Symbol<'ctx>) {
        if !self.modules.contains(&module) {
            self.modules.push(module);
        }
    }

    pub fn modules(&self) -> &[Symbol<'ctx>] {
        &self.modules
    }

    pub fn add_dep(&mut self, target: ComponentId, kind: ComponentKind) {
        if !self.deps.iter().any(|(id, _)| *id == target) {
            self.deps.push((target, kind));
        }
    }

    pub fn deps(&self) -> &[(ComponentId, ComponentKind)] {
        &self.deps
    }
}

/// One edge of a dependency cycle, for diagnostics.
#[derive(Debug, PartialEq, Eq)]
pub struct CycleEdge {
    pub from: String,
    pub to: String,
}

#[derive(Default)]
pub struct Components<'ctx> {
    list: Vec<Component<'ctx>>,
}

impl<'ctx> Components<'ctx> {
    pub fn add(
        &mut self,
        name: Symbol<'ctx>,
        kind: ComponentKind,
        path: Option<PathBuf>,
        is_main: bool,
    ) -> ComponentId {
        let id = ComponentId(self.list.len());
        self.list.push(Component {
            name,
            kind,
            path,
            is_main,
            modules: Vec::default(),
            deps: Vec::default(),
        });
        id
    }

    pub fn get(&self, id: ComponentId) -> &Component<'ctx> {
        &self.list[id.0]
    }

    pub fn get_mut(&mut self, id: ComponentId) -> &mut Component<'ctx> {
        &mut self.list[id.0]
    }

    pub fn find(&self, name: Symbol<'ctx>) -> Option<ComponentId> {
        self.list
            .iter()
            .position(|c| c.name == name)
            .map(ComponentId)
    }

    pub fn find_module_owner(&self, module: Symbol<'ctx>) -> Option<ComponentId> {
        self.list
            .iter()
            .position(|c| c.modules.contains(&module))
            .map(ComponentId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ComponentId, &Component<'ctx>)> {
        self.list
            .iter()
            .enumerate()
            .map(|(i, c)| (ComponentId(i), c))
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Looks for a dependency cycle. On success returns two edges lying on
    /// the cycle: the edge that closes it and the edge that entered the
    /// repeated component.
    pub fn find_cycle(&self) -> Option<(CycleEdge, CycleEdge)> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            White,
            Grey,
            Black,
        }

        fn visit(
            components: &Components,
            id: ComponentId,
            marks: &mut [Mark],
            stack: &mut Vec<ComponentId>,
        ) -> Option<(CycleEdge, CycleEdge)> {
            marks[id.0] = Mark::Grey;
            stack.push(id);
            for (dep, _) in components.get(id).deps() {
                match marks[dep.0] {
                    Mark::Grey => {
                        // `id -> dep` closes the cycle; the edge leaving
                        // `dep` on the stack is the other endpoint.
                        let pos = stack.iter().position(|c| c == dep).expect("on stack");
                        let next = stack.get(pos + 1).copied().unwrap_or(id);
                        let closing = CycleEdge {
                            from: components.get(id).name.to_string(),
                            to: components.get(*dep).name.to_string(),
                        };
                        let entering = CycleEdge {
                            from: components.get(*dep).name.to_string(),
                            to: components.get(next).name.to_string(),
                        };
                        return Some((closing, entering));
                    }
                    Mark::White => {
                        if let Some(found) = visit(components, *dep, marks, stack) {
                            return Some(found);
                        }
                    }
                    Mark::Black => {}
                }
            }
            stack.pop();
            marks[id.0] = Mark::Black;
            None
        }

        let mut marks = vec![Mark::White; self.list.len()];
        let mut stack = Vec::default();
        for i in 0..self.list.len() {
            if marks[i] == Mark::White {
                if let Some(found) = visit(self, ComponentId(i), &mut marks, &mut stack) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Dependency-first ordering. Stable: among components whose
    /// dependencies are satisfied, insertion order is kept. Call only after
    /// `find_cycle` came back empty.
    pub fn topological_order(&self) -> Vec<ComponentId> {
        // edges point from user to dependency, so a component is ready once
        // all of its dependencies are ordered
        let mut order = Vec::with_capacity(self.list.len());
        let mut done = vec![false; self.list.len()];

        loop {
            let mut progressed = false;
            for i in 0..self.list.len() {
                if done[i] {
                    continue;
                }
                let ready = self.list[i].deps().iter().all(|(dep, _)| done[dep.0]);
                if ready {
                    done[i] = true;
                    order.push(ComponentId(i));
                    progressed = true;
                }
            }
            if order.len() == self.list.len() {
                break;
            }
            if !progressed {
                // only reachable with a cycle, which find_cycle rejects first
                unreachable!("topological_order called on a cyclic component graph");
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ASTContext;
    use bumpalo::Bump;

    #[test]
    fn cycle_is_found_and_named() {
        let bump = Bump::new();
        let ctx = ASTContext::new(&bump);
        let mut components = Components::default();
        let a = components.add(ctx.symbol("liba"), ComponentKind::StaticLib, None, false);
        let b = components.add(ctx.symbol("libb"), ComponentKind::StaticLib, None, false);
        components.get_mut(a).add_dep(b, ComponentKind::StaticLib);
        components.get_mut(b).add_dep(a, ComponentKind::StaticLib);

        let (closing, entering) = components.find_cycle().expect("cycle");
        assert_eq!(closing.from, "libb");
        assert_eq!(closing.to, "liba");
        assert_eq!(entering.from, "liba");
        assert_eq!(entering.to, "libb");
    }

    #[test]
    fn acyclic_graph_orders_dependencies_first() {
        let bump = Bump::new();
        let ctx = ASTContext::new(&bump);
        let mut components = Components::default();
        let main = components.add(ctx.symbol("app"), ComponentKind::Executable, None, true);
        let lib = components.add(ctx.symbol("math"), ComponentKind::StaticLib, None, false);
        components.get_mut(main).add_dep(lib, ComponentKind::StaticLib);

        assert!(components.find_cycle().is_none());
        let order = components.topological_order();
        assert_eq!(order, vec![lib, main]);
    }
}
