//! The agent nodes wired into the workflow graphs.

mod book_coordinator;
mod business_analyst;
mod chapters;
mod content_strategist;
mod editor;
mod interventions;
mod outline_reviewer;
mod research;
mod writer;

pub use book_coordinator::BookCoordinator;
pub use business_analyst::BusinessAnalyst;
pub use chapters::{
    ChapterEditor, ChapterReviser, ChapterWriter, CodeExampleGenerator, ExerciseGenerator,
    ExportChapter,
};
pub use content_strategist::ContentStrategist;
pub use editor::Editor;
pub use interventions::{DraftIntervention, OutlineIntervention, TocIntervention};
pub use outline_reviewer::OutlineReviewer;
pub use research::WebResearch;
pub use writer::Writer;
