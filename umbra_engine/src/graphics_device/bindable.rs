/// Bindable - pipeline state that can be bound onto a command list

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{BindingGroup, Buffer, CommandList, IndexType, Pipeline};

/// A piece of GPU state a pass binds before drawing
#[derive(Clone)]
pub enum Bindable {
    Pipeline(Arc<dyn Pipeline>),
    BindingGroup {
        pipeline: Arc<dyn Pipeline>,
        set_index: u32,
        group: Arc<dyn BindingGroup>,
    },
    VertexBuffer {
        buffer: Arc<dyn Buffer>,
        offset: u64,
    },
    IndexBuffer {
        buffer: Arc<dyn Buffer>,
        offset: u64,
        index_type: IndexType,
    },
}

impl Bindable {
    /// A pipeline followed by `groups`, bound at sets 0, 1, ... in order
    pub fn pipeline_state(pipeline: &Arc<dyn Pipeline>, groups: &[&Arc<dyn BindingGroup>]) -> Vec<Bindable> {
        let mut state = Vec::with_capacity(groups.len() + 1);
        state.push(Bindable::Pipeline(Arc::clone(pipeline)));
        state.extend(groups.iter().enumerate().map(|(set_index, group)| Bindable::BindingGroup {
            pipeline: Arc::clone(pipeline),
            set_index: set_index as u32,
            group: Arc::clone(group),
        }));
        state
    }

    /// Vertex and index buffers of an indexed mesh, both read from offset 0
    pub fn mesh(vertex_buffer: &Arc<dyn Buffer>, index_buffer: &Arc<dyn Buffer>, index_type: IndexType) -> [Bindable; 2] {
        [
            Bindable::VertexBuffer { buffer: Arc::clone(vertex_buffer), offset: 0 },
            Bindable::IndexBuffer { buffer: Arc::clone(index_buffer), offset: 0, index_type },
        ]
    }

    /// Record the bind command for this state
    pub fn bind(&self, command_list: &mut dyn CommandList) -> Result<()> {
        match self {
            Bindable::Pipeline(pipeline) => command_list.bind_pipeline(pipeline),
            Bindable::BindingGroup { pipeline, set_index, group } => {
                command_list.bind_binding_group(pipeline, *set_index, group)
            }
            Bindable::VertexBuffer { buffer, offset } => {
                command_list.bind_vertex_buffer(buffer, *offset)
            }
            Bindable::IndexBuffer { buffer, offset, index_type } => {
                command_list.bind_index_buffer(buffer, *offset, *index_type)
            }
        }
    }

    /// Release this reference to the underlying GPU object.
    ///
    /// The object itself is destroyed when its last reference goes away.
    pub fn destroy(self) {
        drop(self);
    }
}

/// Bind every entry of `state` in order
pub fn bind_all(state: &[Bindable], command_list: &mut dyn CommandList) -> Result<()> {
    state.iter().try_for_each(|bindable| bindable.bind(command_list))
}

#[cfg(test)]
#[path = "bindable_tests.rs"]
mod tests;
