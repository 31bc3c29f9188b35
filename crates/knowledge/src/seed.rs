//! Built-in seed corpus of architectural design knowledge.

use archmentor_core::knowledge::KnowledgeItem;
use archmentor_core::state::DesignPhase;

fn item(
    id: &str,
    title: &str,
    content: &str,
    source: &str,
    tags: &[&str],
    phases: &[DesignPhase],
) -> KnowledgeItem {
    KnowledgeItem {
        id: id.into(),
        title: title.into(),
        content: content.into(),
        source: source.into(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        phases: phases.to_vec(),
        score: 0.0,
    }
}

/// The corpus every knowledge base starts with unless disabled in config.
pub fn seed_corpus() -> Vec<KnowledgeItem> {
    use DesignPhase::*;
    vec![
        item(
            "materials-timber",
            "Mass timber",
            "Cross-laminated timber stores carbon and allows fast dry assembly, but needs protection from moisture and careful fire design.",
            "Mass Timber Design Manual",
            &["materials", "structure", "sustainability"],
            &[Materialization],
        ),
        item(
            "materials-concrete",
            "Exposed concrete",
            "Exposed concrete provides thermal mass that evens out daily temperature swings, at the cost of high embodied carbon.",
            "Concrete and Culture",
            &["materials", "sustainability"],
            &[Materialization],
        ),
        item(
            "materials-facade",
            "Facade material selection",
            "Facade material choices balance climate exposure, maintenance, local availability and the character of the surrounding context.",
            "Facade Construction Manual",
            &["materials", "facade"],
            &[Materialization, Visualization],
        ),
        item(
            "light-daylight-depth",
            "Daylight penetration",
            "Useful daylight reaches roughly twice the window head height into a room, so deep plans need light wells or atria.",
            "Daylighting Handbook",
            &["lighting", "sustainability"],
            &[Ideation, Visualization],
        ),
        item(
            "circulation-clarity",
            "Circulation legibility",
            "Legible circulation links entrances, vertical cores and main destinations with clear sight lines and few decision points.",
            "Architecture: Form, Space, and Order",
            &["circulation", "spatial"],
            &[Ideation, Visualization],
        ),
        item(
            "structure-cantilever",
            "Cantilevers",
            "A cantilever transfers load back to its support through bending, so depth at the root and a back-span or anchorage are essential.",
            "Structures: Or Why Things Don't Fall Down",
            &["structure"],
            &[Visualization, Materialization],
        ),
        item(
            "structure-grid",
            "Structural grids",
            "A regular structural grid of six to nine meters keeps spans economical and leaves room for flexible layouts.",
            "Structure as Architecture",
            &["structure", "spatial"],
            &[Ideation, Visualization],
        ),
        item(
            "site-analysis",
            "Site analysis",
            "Site analysis records sun path, prevailing wind, access, topography, views and neighbourhood use before any massing begins.",
            "Site Planning",
            &["site", "context"],
            &[Discovery],
        ),
        item(
            "program-adjacency",
            "Program adjacency",
            "An adjacency matrix of program spaces reveals which rooms must be close, which must be separated and which can share space.",
            "Programming for Design",
            &["program", "spatial"],
            &[Discovery, Ideation],
        ),
        item(
            "museum-galleries",
            "Gallery design",
            "Museum galleries need controlled daylight, flexible walls and a circulation sequence that lets visitors choose their route.",
            "Museum Planning Handbook",
            &["museum", "lighting", "circulation"],
            &[Ideation, Visualization],
        ),
        item(
            "community-thresholds",
            "Community thresholds",
            "Community buildings succeed when entrances are visible, thresholds are generous and ground-floor uses spill out to the street.",
            "Public Places, Urban Spaces",
            &["community", "context"],
            &[Discovery, Ideation],
        ),
        item(
            "acoustics-reverberation",
            "Reverberation control",
            "Parallel hard surfaces lengthen reverberation; absorptive finishes and non-parallel walls improve speech clarity.",
            "Architectural Acoustics",
            &["acoustics", "materials"],
            &[Visualization, Materialization],
        ),
    ]
}
