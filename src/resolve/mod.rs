//! Requirement resolution: pairing translation-layer and symbol
//! requirements, scanning backing layers for known banners, and populating
//! configuration with what was found.
//!
//! A [`SymbolFinder`] runs once per top-level resolution pass. For every
//! symbol requirement with a sibling translation-layer requirement it scans
//! the sibling's backing physical layer against the whole banner database
//! and, on the first hit with a usable candidate, writes the class and
//! source location into configuration and constructs the table. At most one
//! resolution attempt succeeds per pair per pass; remaining hits are never
//! read, which on a multi-gigabyte image matters.
//!
//! A pair that exhausts its hits stays unresolved. That is not an error
//! here; the configuration-validation stage above surfaces it as a
//! could-not-auto-detect condition.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::banners::BannerDatabase;
use crate::config::requirements::{find_requirements, Requirement, RequirementKind};
use crate::config::ConfigPath;
use crate::context::Context;
use crate::error::{Result, VestigeError};
use crate::layer::Layer;
use crate::scan::{PatternSet, ProgressFn};
use crate::symbols::{CLASS_KEY, ISF_FILEPATH_KEY, ISF_KERNEL_CLASS};

/// Leaf under a translation-layer requirement naming its backing physical
/// layer.
pub const MEMORY_LAYER_KEY: &str = "memory_layer";

/// Resolves symbol requirements by banner scanning.
pub struct SymbolFinder {
    banners: Arc<BannerDatabase>,
}

impl SymbolFinder {
    pub fn new(banners: Arc<BannerDatabase>) -> Self {
        Self { banners }
    }

    /// Walk the requirement tree under `root` and attempt to satisfy every
    /// (translation layer, symbols) sibling pair.
    ///
    /// Already-satisfied symbol requirements are skipped without touching
    /// configuration, so a second pass over a fully-resolved tree writes
    /// nothing. Construction failures other than an unusable source
    /// location propagate to the caller.
    pub fn resolve(
        &self,
        ctx: &mut Context,
        root: &Requirement,
        root_path: &ConfigPath,
        mut progress: Option<&mut dyn FnMut(f64)>,
    ) -> Result<()> {
        if self.banners.is_empty() {
            debug!("banner database is empty, nothing to scan for");
            return Ok(());
        }

        let requirements = find_requirements(
            root,
            root_path,
            &[RequirementKind::TranslationLayer, RequirementKind::Symbols],
            false,
        );
        let set = self.banners.pattern_set()?;

        for (parent, requirement_path, requirement) in &requirements {
            if requirement.kind != RequirementKind::Symbols {
                continue;
            }
            if ctx.symbol_table(requirement_path).is_some() {
                debug!(%requirement_path, "symbol requirement already satisfied");
                continue;
            }

            // The sibling translation-layer requirement shares this
            // requirement's parent path.
            let sibling = requirements.iter().find(|(tl_parent, _, tl)| {
                tl.kind == RequirementKind::TranslationLayer && tl_parent == parent
            });
            let Some((_, tl_path, _)) = sibling else {
                debug!(%requirement_path, "no sibling translation-layer requirement");
                continue;
            };

            let layer_key = tl_path.join(MEMORY_LAYER_KEY);
            let Some(layer_name) = ctx.config.get_str(&layer_key).map(str::to_owned) else {
                warn!(%layer_key, "translation layer has no configured backing layer");
                continue;
            };
            let Some(layer) = ctx.layers.get(&layer_name) else {
                warn!(layer = %layer_name, "backing layer is not registered");
                continue;
            };

            self.banner_scan(ctx, requirement_path, layer.as_ref(), &set, &mut progress)?;
        }
        Ok(())
    }

    /// Scan one physical layer and resolve `requirement_path` from the
    /// first usable hit. First match wins; the scan is dropped as soon as a
    /// table is constructed.
    fn banner_scan(
        &self,
        ctx: &mut Context,
        requirement_path: &ConfigPath,
        layer: &dyn Layer,
        set: &PatternSet,
        progress: &mut Option<&mut dyn FnMut(f64)>,
    ) -> Result<()> {
        let callback: Option<Box<ProgressFn<'_>>> = match progress {
            Some(p) => Some(Box::new(|fraction| p(fraction))),
            None => None,
        };

        for hit in set.scan(layer, callback) {
            let Some(banner) = self.banners.banner_at(hit.pattern) else {
                continue;
            };
            debug!(
                offset = hit.offset,
                banner = %String::from_utf8_lossy(banner),
                "identified banner"
            );

            let locations = self.banners.locations(banner).unwrap_or(&[]);
            let Some(first) = locations.first() else {
                debug!("banner has no candidate symbol sources");
                continue;
            };
            if first.is_empty() {
                debug!("candidate symbol source location not recorded");
                continue;
            }

            ctx.config
                .set(&requirement_path.join(CLASS_KEY), ISF_KERNEL_CLASS);
            ctx.config
                .set(&requirement_path.join(ISF_FILEPATH_KEY), first.clone());

            match ctx.construct_symbol_table(requirement_path) {
                Ok(()) => {
                    debug!(%requirement_path, source = %first, "symbol requirement resolved");
                    return Ok(());
                }
                Err(VestigeError::UnusableLocation(location)) => {
                    debug!(%location, "unusable symbol source, trying further hits");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        debug!(%requirement_path, "no usable banner match, requirement left unresolved");
        Ok(())
    }
}
