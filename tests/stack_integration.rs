use std::sync::Arc;

use anyhow::Result;

use vestige::banners::BannerDatabase;
use vestige::config::requirements::{Requirement, RequirementKind};
use vestige::config::ConfigPath;
use vestige::context::Context;
use vestige::layer::BufferLayer;
use vestige::resolve::{SymbolFinder, MEMORY_LAYER_KEY};
use vestige::stack;
use vestige::symbols::ISF_FILEPATH_KEY;

fn image_with_markers(markers: &[(usize, &[u8])], len: usize) -> Vec<u8> {
    let mut data = vec![b'.'; len];
    for (offset, bytes) in markers {
        data[*offset..*offset + bytes.len()].copy_from_slice(bytes);
    }
    data
}

#[test]
fn majority_vote_selects_repeated_anchor() {
    // Three copies of one anchor value and a single stray copy of another:
    // the stray is noise, the majority wins.
    let layer = BufferLayer::new(
        "memory",
        image_with_markers(
            &[
                (10, b"SYMBOL(swapper_pg_dir)=1a2b3c\n"),
                (80, b"SYMBOL(swapper_pg_dir)=1a2b3c\n"),
                (150, b"SYMBOL(swapper_pg_dir)=1a2b3c\n"),
                (220, b"SYMBOL(swapper_pg_dir)=ffffff\n"),
            ],
            300,
        ),
    );
    assert_eq!(stack::stack(&layer, None), Some(0x1a2b3c));
}

#[test]
fn unrecognized_layer_yields_no_anchor() {
    let layer = BufferLayer::new("memory", vec![0u8; 512]);
    assert_eq!(stack::stack(&layer, None), None);
}

#[test]
fn stack_then_resolve_full_pipeline() -> Result<()> {
    // A capture carrying both the kernel anchor export and a known build
    // banner: stacking yields the anchor for the translation-layer
    // constructor, and resolution attaches the matching symbol database.
    let image = image_with_markers(
        &[
            (40, b"SYMBOL(swapper_pg_dir)=3d4000\n"),
            (160, b"Linux version 5.4.0-42-generic"),
        ],
        512,
    );
    let layer = Arc::new(BufferLayer::new("memory", image));

    let anchor = stack::stack(layer.as_ref(), None);
    assert_eq!(anchor, Some(0x3d4000));

    let mut db = BannerDatabase::new();
    db.insert(
        b"Linux version 5.4.0-42-generic".to_vec(),
        vec!["file:///symbols/linux-5.4.json".to_string()],
    );

    let mut ctx = Context::new();
    ctx.layers.insert(layer);
    let tl_path = ConfigPath::new(["plugin", "kernel_layer"]);
    ctx.config.set(&tl_path.join(MEMORY_LAYER_KEY), "memory");

    let tree = Requirement::new("plugin", RequirementKind::Other)
        .with_child(Requirement::new(
            "kernel_layer",
            RequirementKind::TranslationLayer,
        ))
        .with_child(Requirement::new("kernel_symbols", RequirementKind::Symbols));

    SymbolFinder::new(Arc::new(db)).resolve(&mut ctx, &tree, &ConfigPath::root(), None)?;

    let symbols_path = ConfigPath::new(["plugin", "kernel_symbols"]);
    assert_eq!(
        ctx.config.get_str(&symbols_path.join(ISF_FILEPATH_KEY)),
        Some("file:///symbols/linux-5.4.json")
    );
    assert!(ctx.symbol_table(&symbols_path).is_some());
    Ok(())
}
