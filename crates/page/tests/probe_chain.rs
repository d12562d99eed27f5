use radar_page::{
    first_match, AnchorProbe, Document, ElementSpec, PageError, PageTree, Probe, Result,
};

struct Exploding;

impl Probe for Exploding {
    type Output = radar_page::NodeId;

    fn label(&self) -> &str {
        "exploding"
    }

    fn probe(&self, _tree: &dyn PageTree) -> Result<Option<Self::Output>> {
        Err(PageError::Other("malformed anchor".to_string()))
    }
}

enum Link {
    Anchor(AnchorProbe),
    Broken(Exploding),
}

impl Probe for Link {
    type Output = radar_page::NodeId;

    fn label(&self) -> &str {
        match self {
            Self::Anchor(probe) => probe.label(),
            Self::Broken(probe) => probe.label(),
        }
    }

    fn probe(&self, tree: &dyn PageTree) -> Result<Option<Self::Output>> {
        match self {
            Self::Anchor(probe) => probe.probe(tree),
            Self::Broken(probe) => probe.probe(tree),
        }
    }
}

fn document() -> Document {
    let _ = env_logger::builder().is_test(true).try_init();
    let doc = Document::new("https://www.youtube.com/@someone");
    doc.append(
        doc.body(),
        ElementSpec::new("div")
            .id("page-header")
            .child(ElementSpec::new("h1").text("Someone")),
    )
    .expect("header");
    doc
}

#[test]
fn first_matching_link_wins() {
    let doc = document();
    let chain = [
        AnchorProbe::new("new layout", "#channel-header-container"),
        AnchorProbe::new("page header", "#page-header"),
        AnchorProbe::new("heading", "h1"),
    ];
    let hit = first_match(&doc, &chain).expect("match");
    assert_eq!(hit.label, "page header");
    assert_eq!(hit.position, 1);
}

#[test]
fn failing_probe_does_not_abort_the_chain() {
    let doc = document();
    let chain = [
        Link::Broken(Exploding),
        Link::Anchor(AnchorProbe::new("invalid selector", "div[")),
        Link::Anchor(AnchorProbe::new("heading", "#page-header h1")),
    ];
    let hit = first_match(&doc, &chain).expect("match");
    assert_eq!(hit.label, "heading");
    assert_eq!(doc.text(hit.value).expect("text"), "Someone");
}

#[test]
fn exhausted_chain_is_none() {
    let doc = document();
    let chain = [AnchorProbe::new("absent", "ytd-watch-flexy")];
    assert!(first_match(&doc, &chain).is_none());
}
