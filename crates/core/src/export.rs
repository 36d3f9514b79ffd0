use crate::model::NodeKind;
use crate::tree::FileTree;

fn kind_label(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::File => "file",
        NodeKind::Dir => "dir",
    }
}

pub fn to_csv(tree: &FileTree, mut w: impl std::io::Write) -> csv::Result<()> {
    let mut writer = csv::Writer::from_writer(&mut w);
    writer.write_record(["path", "kind", "length"]).ok();
    let mut rows: Vec<[String; 3]> = Vec::new();
    tree.for_each(|n| {
        rows.push([
            n.path.clone(),
            kind_label(n.kind()).to_string(),
            n.contents().map(|c| c.len().to_string()).unwrap_or_default(),
        ]);
    });
    for row in rows {
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn to_json(tree: &FileTree) -> serde_json::Value {
    let mut nodes = Vec::new();
    tree.for_each(|n| {
        nodes.push(serde_json::json!({
            "id": n.id.0,
            "parent": n.parent.map(|p| p.0),
            "path": n.path,
            "kind": kind_label(n.kind()),
            "length": n.contents().map(|c| c.len()),
            "children": n.children().iter().map(|c| c.0).collect::<Vec<_>>()
        }));
    });
    serde_json::json!({
        "root": tree.root().map(|r| r.0),
        "count": tree.count(),
        "nodes": nodes
    })
}
