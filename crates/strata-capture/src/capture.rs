use crate::memory::MemoryView;
use crate::submit::{EngineType, QueueType, SubmitInfo};

/// Surface details attached to a present record, when the capture layer was
/// able to resolve them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresentSurfaceInfo {
    pub full_screen: bool,
    pub engine_type: EngineType,
    pub queue_type: QueueType,
    pub surface_addr: u64,
    pub surface_size: u32,
}

/// A present recorded between submits. `submit_index` names the submit the
/// present immediately follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresentInfo {
    pub submit_index: u32,
    pub surface: Option<PresentSurfaceInfo>,
}

/// A complete captured frame: submits, presents, and the simulated GPU
/// address space their indirect buffers live in.
pub struct Capture {
    submits: Vec<SubmitInfo>,
    presents: Vec<PresentInfo>,
    memory: Box<dyn MemoryView>,
    metadata_version: u32,
}

impl Capture {
    pub fn new(memory: Box<dyn MemoryView>, submits: Vec<SubmitInfo>) -> Self {
        Self {
            submits,
            presents: Vec::new(),
            memory,
            metadata_version: 0,
        }
    }

    pub fn with_presents(mut self, presents: Vec<PresentInfo>) -> Self {
        self.presents = presents;
        self
    }

    pub fn with_metadata_version(mut self, version: u32) -> Self {
        self.metadata_version = version;
        self
    }

    pub fn num_submits(&self) -> u32 {
        self.submits.len() as u32
    }

    pub fn submit_info(&self, submit_index: u32) -> &SubmitInfo {
        &self.submits[submit_index as usize]
    }

    pub fn num_presents(&self) -> u32 {
        self.presents.len() as u32
    }

    pub fn present_info(&self, present_index: u32) -> &PresentInfo {
        &self.presents[present_index as usize]
    }

    pub fn memory(&self) -> &dyn MemoryView {
        &*self.memory
    }

    pub fn metadata_version(&self) -> u32 {
        self.metadata_version
    }
}
