use tracing::debug;

use super::{events::Subscribers, project::Project};

/// Ordered projects. Position is identity: removal and the presentation layer both refer to
/// projects by index, and indices stay contiguous.
#[derive(Debug, Default)]
pub struct ProjectList {
    projects: Vec<Project>,
    on_add: Subscribers<Project>,
    on_remove: Subscribers<usize>,
}

impl ProjectList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_add(&mut self) -> &mut Subscribers<Project> {
        &mut self.on_add
    }

    pub fn on_remove(&mut self) -> &mut Subscribers<usize> {
        &mut self.on_remove
    }

    /// Appends the project, then tells `on_add` subscribers about it. The new index is `len() - 1`.
    pub fn add(&mut self, project: Project) {
        self.projects.push(project);
        if let Some(added) = self.projects.last() {
            debug!("Added project {:?}", added.name());
            self.on_add.emit(added);
        }
    }

    /// Out of range indices are ignored. Subscribers are notified before the project is removed.
    pub fn remove(&mut self, index: usize) {
        if index >= self.projects.len() {
            return;
        }
        self.on_remove.emit(&index);
        let removed = self.projects.remove(index);
        debug!("Removed project {:?} at {index}", removed.name());
    }

    /// Removes everything (last index first) and then adds `projects` in order, so subscribers see
    /// the same notifications as for individual calls.
    pub fn replace_all(&mut self, projects: impl IntoIterator<Item = Project>) {
        while let Some(last) = self.projects.len().checked_sub(1) {
            self.remove(last);
        }
        for project in projects {
            self.add(project);
        }
    }

    pub fn for_each(&self, mut visitor: impl FnMut(&Project, usize, &ProjectList)) {
        for (index, project) in self.projects.iter().enumerate() {
            visitor(project, index, self);
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Project> {
        self.projects.iter()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Project> {
        self.projects.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Project> {
        self.projects.get_mut(index)
    }
}

impl<'a> IntoIterator for &'a ProjectList {
    type Item = &'a Project;
    type IntoIter = std::slice::Iter<'a, Project>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use crate::{
        tracking::project::Project,
        utils::clock::{Clock, ManualClock},
    };

    use super::ProjectList;

    #[derive(Debug, PartialEq)]
    enum Seen {
        Added(String),
        Removed(usize),
    }

    fn list_with(names: &[&str], clock: &Arc<dyn Clock>) -> ProjectList {
        let mut list = ProjectList::new();
        for name in names {
            list.add(Project::new(*name, clock.clone()));
        }
        list
    }

    fn observe(list: &mut ProjectList) -> Arc<Mutex<Vec<Seen>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let added = seen.clone();
        list.on_add()
            .subscribe(move |p| added.lock().unwrap().push(Seen::Added(p.name().into())));
        let removed = seen.clone();
        list.on_remove()
            .subscribe(move |i| removed.lock().unwrap().push(Seen::Removed(*i)));
        seen
    }

    fn names(list: &ProjectList) -> Vec<&str> {
        list.iter().map(|p| p.name()).collect()
    }

    #[test]
    fn test_add_appends_and_notifies_with_project() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::at(0));
        let mut list = ProjectList::new();
        let seen = observe(&mut list);

        list.add(Project::new("a", clock.clone()));
        list.add(Project::new("b", clock.clone()));

        assert_eq!(names(&list), vec!["a", "b"]);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Seen::Added("a".into()), Seen::Added("b".into())]
        );
    }

    #[test]
    fn test_remove_out_of_range_is_silent() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::at(0));
        let mut list = list_with(&["a", "b"], &clock);
        let seen = observe(&mut list);

        list.remove(2);
        list.remove(usize::MAX);

        assert_eq!(names(&list), vec!["a", "b"]);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_remove_compacts_indices() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::at(0));
        let mut list = list_with(&["a", "b", "c"], &clock);
        let seen = observe(&mut list);

        list.remove(1);

        assert_eq!(list.len(), 2);
        assert_eq!(list.get(1).map(|p| p.name()), Some("c"));
        assert!(list.get(2).is_none());
        assert_eq!(*seen.lock().unwrap(), vec![Seen::Removed(1)]);
    }

    #[test]
    fn test_notifications_keep_mirror_in_sync() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::at(0));
        let mut list = ProjectList::new();
        let rows = Arc::new(Mutex::new(Vec::<String>::new()));

        let added = rows.clone();
        list.on_add()
            .subscribe(move |p| added.lock().unwrap().push(p.name().into()));
        let removed = rows.clone();
        list.on_remove().subscribe(move |i| {
            removed.lock().unwrap().remove(*i);
        });

        for name in ["a", "b", "c", "d"] {
            list.add(Project::new(name, clock.clone()));
        }
        list.remove(1);
        list.remove(7);
        list.remove(2);

        assert_eq!(*rows.lock().unwrap(), names(&list));
        assert_eq!(names(&list), vec!["a", "c"]);
    }

    #[test]
    fn test_replace_all_removes_then_adds() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::at(0));
        let mut list = list_with(&["a", "b"], &clock);
        let seen = observe(&mut list);

        list.replace_all(vec![
            Project::new("x", clock.clone()),
            Project::new("y", clock.clone()),
            Project::new("z", clock.clone()),
        ]);

        assert_eq!(names(&list), vec!["x", "y", "z"]);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                Seen::Removed(1),
                Seen::Removed(0),
                Seen::Added("x".into()),
                Seen::Added("y".into()),
                Seen::Added("z".into()),
            ]
        );
    }

    #[test]
    fn test_for_each_visits_in_order() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::at(0));
        let list = list_with(&["a", "b", "c"], &clock);
        let mut visited = Vec::new();

        list.for_each(|project, index, whole| {
            assert_eq!(whole.len(), 3);
            visited.push((index, project.name().to_string()));
        });

        assert_eq!(
            visited,
            vec![(0, "a".into()), (1, "b".into()), (2, "c".into())]
        );
    }

    #[test]
    fn test_get_out_of_range_is_none() {
        let list = ProjectList::new();
        assert!(list.get(0).is_none());
        assert!(list.is_empty());
    }
}
