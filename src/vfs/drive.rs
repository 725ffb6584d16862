//! A named top-level mount within the archive, addressed by alias.

use std::sync::Arc;

use super::node::FolderNode;

pub struct Drive {
    pub alias: String,
    pub name: String,
    pub root: Arc<FolderNode>,
}

impl Drive {
    pub fn new_lazy(alias: String, name: String, root: Arc<FolderNode>) -> Self {
        Self { alias, name, root }
    }

    pub fn new_mem(alias: String, name: String) -> Self {
        Self {
            alias,
            name,
            root: Arc::new(FolderNode::new_mem(String::new())),
        }
    }
}
