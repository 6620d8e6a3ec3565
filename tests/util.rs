#![allow(dead_code)]
use mesh_halo::prelude::*;

pub fn did(u: usize) -> DomainId {
    DomainId::new(u)
}

pub fn ext(e: [i32; 6]) -> IndexExtents {
    IndexExtents::from_array(e)
}

/// Same-level registry from point extents, boundaries calculated.
pub fn registry_with(cfg: BoundaryConfig, extents: &[[i32; 6]]) -> BoundaryRegistry {
    let mut reg = BoundaryRegistry::new(cfg).unwrap();
    reg.set_num_domains(extents.len()).unwrap();
    for (i, e) in extents.iter().enumerate() {
        reg.set_extents(did(i), ext(*e)).unwrap();
    }
    reg.calculate_boundaries().unwrap();
    reg
}

pub fn registry(extents: &[[i32; 6]]) -> BoundaryRegistry {
    registry_with(BoundaryConfig::default(), extents)
}

/// Two-level registry: `coarse` at level 0, `fine` at level 1, ratio `r`.
pub fn amr_registry(r: [i32; 3], coarse: &[[i32; 6]], fine: &[[i32; 6]]) -> BoundaryRegistry {
    let mut reg = BoundaryRegistry::new(BoundaryConfig::default()).unwrap();
    reg.set_num_domains(coarse.len() + fine.len()).unwrap();
    reg.set_refinement_ratios(vec![r]).unwrap();
    for (i, e) in coarse.iter().enumerate() {
        reg.set_indices_for_amr_patch(did(i), 0, ext(*e)).unwrap();
    }
    for (i, e) in fine.iter().enumerate() {
        reg.set_indices_for_amr_patch(did(coarse.len() + i), 1, ext(*e))
            .unwrap();
    }
    reg.calculate_boundaries().unwrap();
    reg
}

/// Scalar field whose value encodes the global index of each entry, so a
/// ghost value can be traced back to the donor entry it came from.
pub fn global_tagged(reg: &BoundaryRegistry, d: DomainId, centering: Centering) -> Section<f64> {
    let dom = reg.domain(d).unwrap().clone();
    Section::from_fn(dom.local_dims(centering), 1, |idx, _| {
        let g = dom.to_global(idx.map(|v| v as i32), centering);
        encode(g)
    })
}

pub fn encode(g: [i32; 3]) -> f64 {
    (g[0] + 1000 * g[1] + 1_000_000 * g[2]) as f64
}

pub fn all_fields(
    reg: &BoundaryRegistry,
    centering: Centering,
) -> DomainFields<Section<f64>> {
    reg.finished_domains()
        .into_iter()
        .map(|d| (d, global_tagged(reg, d, centering)))
        .collect()
}

/// Two-rank Rayon comms (ranks 0 and 1).
pub fn rayons() -> (RayonComm, RayonComm) {
    (RayonComm::new(0, 2), RayonComm::new(1, 2))
}
