mod util;
use util::*;

use mesh_halo::ghost::GhostLayout;
use mesh_halo::prelude::*;

const PAIR: [[i32; 6]; 2] = [[0, 5, 0, 4, 0, 0], [5, 10, 0, 4, 0, 0]];
const L_TRIO: [[i32; 6]; 3] = [[0, 4, 0, 4, 0, 0], [4, 8, 0, 4, 0, 0], [0, 4, 4, 8, 0, 0]];

fn value(field: &Section<f64>, layout: &GhostLayout, local: [i32; 3]) -> Vec<f64> {
    field
        .try_restrict(layout.slot(local).expect("inside envelope"))
        .unwrap()
        .to_vec()
}

fn flipped_pair(policy: VectorComponentPolicy) -> BoundaryRegistry {
    let mut reg = BoundaryRegistry::new(BoundaryConfig {
        vector_components: policy,
        ..Default::default()
    })
    .unwrap();
    reg.set_num_domains(2).unwrap();
    reg.set_extents(did(0), ext([0, 4, 0, 2, 0, 0])).unwrap();
    reg.set_extents(did(1), ext([4, 8, 0, 2, 0, 0])).unwrap();
    reg.set_frame(did(1), AxisTransform::reversing([true, false, false]))
        .unwrap();
    reg.calculate_boundaries().unwrap();
    reg
}

#[test]
fn scalar_cells_carry_donor_values() {
    let reg = registry(&PAIR);
    let comm = LocalExchange;
    let ex = FieldExchanger::new(&reg, &comm);
    let out = ex
        .exchange_scalar(&[did(0), did(1)], &all_fields(&reg, Centering::Cell), Centering::Cell)
        .unwrap();

    let syn = GhostSynthesizer::new(&reg);
    let layout = syn.layout(did(0), Centering::Cell).unwrap();
    let f0 = &out[&did(0)];
    assert_eq!(f0.dims(), [6, 4, 1]);
    for j in 0..4 {
        assert_eq!(value(f0, &layout, [2, j, 0]), vec![encode([2, j, 0])]);
        assert_eq!(value(f0, &layout, [5, j, 0]), vec![encode([5, j, 0])]);
    }

    let layout1 = syn.layout(did(1), Centering::Cell).unwrap();
    let f1 = &out[&did(1)];
    for j in 0..4 {
        assert_eq!(value(f1, &layout1, [-1, j, 0]), vec![encode([4, j, 0])]);
    }
}

#[test]
fn scalar_points_extend_past_the_shared_face() {
    let reg = registry(&PAIR);
    let comm = LocalExchange;
    let ex = FieldExchanger::new(&reg, &comm);
    let out = ex
        .exchange_scalar(&[did(0)], &all_fields(&reg, Centering::Point), Centering::Point)
        .unwrap();
    let layout = GhostSynthesizer::new(&reg)
        .layout(did(0), Centering::Point)
        .unwrap();
    let f0 = &out[&did(0)];
    assert_eq!(f0.dims(), [7, 5, 1]);
    for j in 0..5 {
        assert_eq!(value(f0, &layout, [5, j, 0]), vec![encode([5, j, 0])]);
        assert_eq!(value(f0, &layout, [6, j, 0]), vec![encode([6, j, 0])]);
    }
}

#[test]
fn uncovered_corner_gets_the_sentinel() {
    let reg = registry(&L_TRIO);
    let comm = LocalExchange;
    let ex = FieldExchanger::new(&reg, &comm);
    let out = ex
        .exchange_scalar(&[did(0)], &all_fields(&reg, Centering::Cell), Centering::Cell)
        .unwrap();
    let layout = GhostSynthesizer::new(&reg)
        .layout(did(0), Centering::Cell)
        .unwrap();
    let f0 = &out[&did(0)];
    assert!(value(f0, &layout, [4, 4, 0])[0].is_nan());
    assert_eq!(value(f0, &layout, [4, 0, 0]), vec![encode([4, 0, 0])]);
    assert_eq!(value(f0, &layout, [0, 4, 0]), vec![encode([0, 4, 0])]);
}

#[test]
fn absent_donor_fills_sentinel_without_failing() {
    let reg = registry(&PAIR);
    let comm = LocalExchange;
    let ex = FieldExchanger::new(&reg, &comm);
    let mut fields = DomainFields::new();
    fields.insert(did(0), global_tagged(&reg, did(0), Centering::Cell));
    let out = ex
        .exchange_scalar(&[did(0)], &fields, Centering::Cell)
        .unwrap();
    let layout = GhostSynthesizer::new(&reg)
        .layout(did(0), Centering::Cell)
        .unwrap();
    for j in 0..4 {
        assert!(value(&out[&did(0)], &layout, [5, j, 0])[0].is_nan());
        assert_eq!(value(&out[&did(0)], &layout, [4, j, 0]), vec![encode([4, j, 0])]);
    }
}

#[test]
fn integer_fields_use_their_own_sentinel() {
    let reg = registry(&L_TRIO);
    let comm = LocalExchange;
    let ex = FieldExchanger::new(&reg, &comm);
    let fields: DomainFields<Section<i32>> = reg
        .finished_domains()
        .into_iter()
        .map(|d| (d, Section::filled([4, 4, 1], 1, d.get() as i32 + 1)))
        .collect();
    let out = ex
        .exchange_scalar(&[did(0)], &fields, Centering::Cell)
        .unwrap();
    let f0 = &out[&did(0)];
    assert_eq!(f0.at([4, 4, 0]).unwrap(), &[i32::MIN]);
    assert_eq!(f0.at([4, 0, 0]).unwrap(), &[2]);
    assert_eq!(f0.at([0, 4, 0]).unwrap(), &[3]);
}

#[test]
fn reversed_frame_remaps_donor_index() {
    let reg = flipped_pair(VectorComponentPolicy::Preserve);
    let syn = GhostSynthesizer::new(&reg);
    assert_eq!(
        syn.remap_index(did(0), 0, [4, 1, 0], Centering::Cell).unwrap(),
        [3, 1, 0]
    );
    assert_eq!(
        syn.remap_index(did(1), 0, [4, 0, 0], Centering::Cell).unwrap(),
        [3, 0, 0]
    );
    assert!(matches!(
        syn.remap_index(did(0), 0, [8, 1, 0], Centering::Cell),
        Err(MeshHaloError::TranslationOutOfBounds { .. })
    ));

    let comm = LocalExchange;
    let ex = FieldExchanger::new(&reg, &comm);
    let out = ex
        .exchange_scalar(&[did(0), did(1)], &all_fields(&reg, Centering::Cell), Centering::Cell)
        .unwrap();
    let l0 = syn.layout(did(0), Centering::Cell).unwrap();
    let l1 = syn.layout(did(1), Centering::Cell).unwrap();
    // domain 1 runs backwards, so its ghost column sits above its real zones
    assert_eq!(l1.lower, [0, 0, 0]);
    assert_eq!(l1.upper, [1, 0, 0]);
    for j in 0..2 {
        assert_eq!(value(&out[&did(0)], &l0, [4, j, 0]), vec![encode([4, j, 0])]);
        assert_eq!(value(&out[&did(1)], &l1, [4, j, 0]), vec![encode([3, j, 0])]);
    }
}

fn vector_fields(reg: &BoundaryRegistry) -> DomainFields<Section<f64>> {
    let mut fields = DomainFields::new();
    fields.insert(did(0), Section::new([4, 2, 1], 3));
    fields.insert(
        did(1),
        Section::from_fn([4, 2, 1], 3, |_, c| (c + 1) as f64),
    );
    assert_eq!(reg.domain(did(1)).unwrap().local_dims(Centering::Cell), [4, 2, 1]);
    fields
}

#[test]
fn vectors_follow_orientation_when_asked() {
    let reg = flipped_pair(VectorComponentPolicy::FollowOrientation);
    assert!(!reg.neighbors(did(0)).unwrap()[0].orientation.is_identity());
    let comm = LocalExchange;
    let ex = FieldExchanger::new(&reg, &comm);
    let out = ex
        .exchange_vector(&[did(0)], &vector_fields(&reg), Centering::Cell)
        .unwrap();
    let layout = GhostSynthesizer::new(&reg)
        .layout(did(0), Centering::Cell)
        .unwrap();
    for j in 0..2 {
        assert_eq!(value(&out[&did(0)], &layout, [4, j, 0]), vec![-1.0, 2.0, 3.0]);
    }
}

#[test]
fn vectors_are_copied_verbatim_by_default() {
    let reg = flipped_pair(VectorComponentPolicy::default());
    let comm = LocalExchange;
    let ex = FieldExchanger::new(&reg, &comm);
    let out = ex
        .exchange_vector(&[did(0)], &vector_fields(&reg), Centering::Cell)
        .unwrap();
    let layout = GhostSynthesizer::new(&reg)
        .layout(did(0), Centering::Cell)
        .unwrap();
    assert_eq!(value(&out[&did(0)], &layout, [4, 1, 0]), vec![1.0, 2.0, 3.0]);
    assert_eq!(value(&out[&did(0)], &layout, [3, 1, 0]), vec![0.0, 0.0, 0.0]);
}

fn material_fields(reg: &BoundaryRegistry) -> DomainFields<RaggedSection<MaterialFraction>> {
    reg.finished_domains()
        .into_iter()
        .map(|d| {
            let dims = reg.domain(d).unwrap().local_dims(Centering::Cell);
            let n: usize = dims.iter().product();
            let chains = (0..n).map(|i| {
                if d == did(0) {
                    Vec::new()
                } else if i % dims[0] == 0 {
                    vec![MaterialFraction::new(1, 0.25), MaterialFraction::new(2, 0.75)]
                } else {
                    vec![MaterialFraction::new(i as i32, 1.0)]
                }
            });
            (d, RaggedSection::from_chains(dims, chains).unwrap())
        })
        .collect()
}

#[test]
fn material_chains_cross_the_seam_intact() {
    let reg = registry(&PAIR);
    let comm = LocalExchange;
    let ex = FieldExchanger::<f64, _, _>::new(&reg, &comm);
    let out = ex
        .exchange_material(&[did(0)], &material_fields(&reg))
        .unwrap();
    let layout = GhostSynthesizer::new(&reg)
        .layout(did(0), Centering::Cell)
        .unwrap();
    let m = &out[&did(0)];
    assert_eq!(m.dims(), [6, 4, 1]);
    for j in 0..4 {
        let chain = m.chain(layout.slot([5, j, 0]).unwrap()).unwrap();
        assert_eq!(
            chain,
            &[MaterialFraction::new(1, 0.25), MaterialFraction::new(2, 0.75)]
        );
        assert!(m.chain(layout.slot([4, j, 0]).unwrap()).unwrap().is_empty());
    }
    assert_eq!(m.total(), 8);
}

#[test]
fn orphan_zone_gets_an_empty_material_chain() {
    let reg = registry(&L_TRIO);
    let comm = LocalExchange;
    let ex = FieldExchanger::<f64, _, _>::new(&reg, &comm);
    let out = ex
        .exchange_material(&[did(0)], &material_fields(&reg))
        .unwrap();
    let layout = GhostSynthesizer::new(&reg)
        .layout(did(0), Centering::Cell)
        .unwrap();
    let m = &out[&did(0)];
    assert!(m.chain(layout.slot([4, 4, 0]).unwrap()).unwrap().is_empty());
    assert_eq!(m.chain(layout.slot([4, 0, 0]).unwrap()).unwrap().len(), 2);
    assert_eq!(
        m.chain(layout.slot([4, 1, 0]).unwrap()).unwrap(),
        &[MaterialFraction::new(1, 0.25), MaterialFraction::new(2, 0.75)]
    );
}

#[test]
fn mixvar_chain_order_is_preserved() {
    let reg = registry(&PAIR);
    let comm = LocalExchange;
    let ex = FieldExchanger::new(&reg, &comm);
    let fields: DomainFields<RaggedSection<f64>> = reg
        .finished_domains()
        .into_iter()
        .map(|d| {
            let chains = (0..20).map(|i| vec![(d.get() * 100 + i) as f64, -1.0, 0.5]);
            (d, RaggedSection::from_chains([5, 4, 1], chains).unwrap())
        })
        .collect();
    let out = ex.exchange_mixvar(&[did(0)], &fields).unwrap();
    let layout = GhostSynthesizer::new(&reg)
        .layout(did(0), Centering::Cell)
        .unwrap();
    // ghost column (5, 2) is zone (0, 2) of domain 1
    let chain = out[&did(0)].chain(layout.slot([5, 2, 0]).unwrap()).unwrap();
    assert_eq!(chain, &[110.0, -1.0, 0.5]);
}

#[test]
fn rectilinear_coordinates_grow_by_the_ghost_nodes() {
    let reg = registry(&PAIR);
    let comm = LocalExchange;
    let ex = FieldExchanger::new(&reg, &comm);
    let coords: DomainFields<MeshCoords<f64>> = reg
        .finished_domains()
        .into_iter()
        .map(|d| {
            let e = reg.domain(d).unwrap().extents;
            let axis = |a: usize| (e.lo[a]..=e.hi[a]).map(|v| v as f64 * 0.5).collect::<Vec<_>>();
            (
                d,
                MeshCoords::Rectilinear {
                    x: axis(0),
                    y: axis(1),
                    z: axis(2),
                },
            )
        })
        .collect();
    let out = ex.exchange_mesh(&[did(0), did(1)], &coords).unwrap();
    let MeshCoords::Rectilinear { x, y, z } = &out[&did(0)] else {
        panic!("flavour changed");
    };
    assert_eq!(x, &[0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0]);
    assert_eq!(y, &[0.0, 0.5, 1.0, 1.5, 2.0]);
    assert_eq!(z, &[0.0]);
    let MeshCoords::Rectilinear { x, .. } = &out[&did(1)] else {
        panic!("flavour changed");
    };
    assert_eq!(x, &[2.0, 2.5, 3.0, 3.5, 4.0, 4.5, 5.0]);
}

/// Rectilinear axes holding half the global index along the global axis
/// each local axis runs on.
fn half_step_axes(reg: &BoundaryRegistry) -> DomainFields<MeshCoords<f64>> {
    reg.finished_domains()
        .into_iter()
        .map(|d| {
            let dom = reg.domain(d).unwrap().clone();
            let dims = dom.local_dims(Centering::Point);
            let origin = dom.to_global([0, 0, 0], Centering::Point);
            let axis = |a: usize| {
                let mut step = [0; 3];
                step[a] = 1;
                let next = dom.to_global(step, Centering::Point);
                let g = (0..3).find(|&ax| next[ax] != origin[ax]).unwrap_or(a);
                (0..dims[a] as i32)
                    .map(|i| {
                        let mut local = [0; 3];
                        local[a] = i;
                        dom.to_global(local, Centering::Point)[g] as f64 * 0.5
                    })
                    .collect::<Vec<_>>()
            };
            (
                d,
                MeshCoords::Rectilinear {
                    x: axis(0),
                    y: axis(1),
                    z: axis(2),
                },
            )
        })
        .collect()
}

#[test]
fn rectilinear_axes_follow_a_permuted_donor_frame() {
    let mut reg = BoundaryRegistry::new(BoundaryConfig::default()).unwrap();
    reg.set_num_domains(2).unwrap();
    reg.set_extents(did(0), ext([0, 4, 0, 2, 0, 0])).unwrap();
    reg.set_extents(did(1), ext([4, 8, 0, 2, 0, 0])).unwrap();
    reg.set_frame(did(1), AxisTransform::from_signed([2, 1, 3]).unwrap())
        .unwrap();
    reg.calculate_boundaries().unwrap();

    let comm = LocalExchange;
    let ex = FieldExchanger::new(&reg, &comm);
    let out = ex
        .exchange_mesh(&[did(0), did(1)], &half_step_axes(&reg))
        .unwrap();
    let MeshCoords::Rectilinear { x, y, .. } = &out[&did(0)] else {
        panic!("flavour changed");
    };
    assert_eq!(x, &[0.0, 0.5, 1.0, 1.5, 2.0, 2.5]);
    assert_eq!(y, &[0.0, 0.5, 1.0]);
    // domain 1 runs global x along its local y
    let MeshCoords::Rectilinear { x, y, .. } = &out[&did(1)] else {
        panic!("flavour changed");
    };
    assert_eq!(x, &[0.0, 0.5, 1.0]);
    assert_eq!(y, &[1.5, 2.0, 2.5, 3.0, 3.5, 4.0]);
}

#[test]
fn curvilinear_coordinates_are_never_reoriented() {
    let reg = flipped_pair(VectorComponentPolicy::FollowOrientation);
    let comm = LocalExchange;
    let ex = FieldExchanger::new(&reg, &comm);
    let coords: DomainFields<MeshCoords<f64>> = reg
        .finished_domains()
        .into_iter()
        .map(|d| {
            let dom = reg.domain(d).unwrap().clone();
            let pts = Section::from_fn(dom.local_dims(Centering::Point), 3, |idx, c| {
                dom.to_global(idx.map(|v| v as i32), Centering::Point)[c] as f64
            });
            (d, MeshCoords::Curvilinear(pts))
        })
        .collect();
    let out = ex.exchange_mesh(&[did(0)], &coords).unwrap();
    let layout = GhostSynthesizer::new(&reg)
        .layout(did(0), Centering::Point)
        .unwrap();
    let MeshCoords::Curvilinear(p) = &out[&did(0)] else {
        panic!("flavour changed");
    };
    assert_eq!(value(p, &layout, [5, 2, 0]), vec![5.0, 2.0, 0.0]);
}

#[test]
fn coarse_and_fine_zones_exchange_across_levels() {
    let reg = amr_registry([2, 2, 1], &[[0, 4, 0, 4, 0, 0]], &[[8, 12, 0, 8, 0, 0]]);
    let comm = LocalExchange;
    let ex = FieldExchanger::new(&reg, &comm);
    let out = ex
        .exchange_scalar(&[did(0), did(1)], &all_fields(&reg, Centering::Cell), Centering::Cell)
        .unwrap();
    let syn = GhostSynthesizer::new(&reg);

    let fine = syn.layout(did(1), Centering::Cell).unwrap();
    for j in 0..8 {
        let coarse_cell = [3, j / 2, 0];
        assert_eq!(value(&out[&did(1)], &fine, [-1, j, 0]), vec![encode(coarse_cell)]);
        assert_eq!(value(&out[&did(1)], &fine, [-2, j, 0]), vec![encode(coarse_cell)]);
    }

    let coarse = syn.layout(did(0), Centering::Cell).unwrap();
    for j in 0..4 {
        assert_eq!(value(&out[&did(0)], &coarse, [4, j, 0]), vec![encode([8, 2 * j, 0])]);
    }
}

#[test]
fn coarse_ghost_nodes_read_the_matching_fine_nodes() {
    let reg = amr_registry([2, 2, 1], &[[0, 4, 0, 4, 0, 0]], &[[8, 12, 0, 8, 0, 0]]);
    let comm = LocalExchange;
    let ex = FieldExchanger::new(&reg, &comm);
    let out = ex
        .exchange_scalar(&[did(0)], &all_fields(&reg, Centering::Point), Centering::Point)
        .unwrap();
    let layout = GhostSynthesizer::new(&reg)
        .layout(did(0), Centering::Point)
        .unwrap();
    for j in 0..=4 {
        assert_eq!(value(&out[&did(0)], &layout, [5, j, 0]), vec![encode([10, 2 * j, 0])]);
        assert_eq!(value(&out[&did(0)], &layout, [4, j, 0]), vec![encode([4, j, 0])]);
    }
}

#[test]
fn fine_ghost_nodes_fill_only_on_coarse_nodes() {
    let reg = amr_registry([2, 2, 1], &[[0, 4, 0, 4, 0, 0]], &[[8, 16, 0, 8, 0, 0]]);
    let comm = LocalExchange;
    let ex = FieldExchanger::new(&reg, &comm);
    let out = ex
        .exchange_scalar(&[did(1)], &all_fields(&reg, Centering::Point), Centering::Point)
        .unwrap();
    let layout = GhostSynthesizer::new(&reg)
        .layout(did(1), Centering::Point)
        .unwrap();
    assert_eq!(layout.lower, [2, 0, 0]);
    let fine = &out[&did(1)];
    for j in 0..=8 {
        // local x = -2 is global x = 6, on coarse node 3
        let on_lattice = value(fine, &layout, [-2, j, 0])[0];
        if j % 2 == 0 {
            assert_eq!(on_lattice, encode([3, j / 2, 0]));
        } else {
            assert!(on_lattice.is_nan());
        }
        assert!(value(fine, &layout, [-1, j, 0])[0].is_nan());
        assert_eq!(value(fine, &layout, [0, j, 0]), vec![encode([8, j, 0])]);
    }

    let plan = GhostSynthesizer::new(&reg)
        .ghost_plan(did(1), Centering::Point)
        .unwrap();
    assert_eq!(plan.links.len(), 1);
    assert_eq!(plan.links[0].sources.len(), 5);
    assert_eq!(plan.orphans.len(), 13);
}

#[test]
fn tagged_payloads_dispatch_by_shape() {
    let reg = registry(&PAIR);
    let comm = LocalExchange;
    let ex = FieldExchanger::new(&reg, &comm);
    let fields: DomainFields<FieldPayload<f64>> = all_fields(&reg, Centering::Cell)
        .into_iter()
        .map(|(d, s)| (d, FieldPayload::Scalar(s)))
        .collect();
    let out = ex.exchange(&[did(0)], &fields, Centering::Cell).unwrap();
    let FieldPayload::Scalar(s) = &out[&did(0)] else {
        panic!("payload kind changed");
    };
    assert_eq!(s.at([5, 1, 0]).unwrap(), &[encode([5, 1, 0])]);

    let mut mixed = fields.clone();
    mixed.insert(did(1), FieldPayload::Vector(Section::new([5, 4, 1], 3)));
    let err = ex.exchange(&[did(0)], &mixed, Centering::Cell).unwrap_err();
    assert!(matches!(err, MeshHaloError::MixedPayloadKinds(_)));

    let empty = DomainFields::<FieldPayload<f64>>::new();
    assert!(matches!(
        ex.exchange(&[did(0)], &empty, Centering::Cell),
        Err(MeshHaloError::MissingField(_))
    ));
    assert!(ex.exchange(&[], &empty, Centering::Cell).unwrap().is_empty());
}

#[test]
fn request_errors_are_fatal() {
    let reg = registry(&PAIR);
    let comm = LocalExchange;
    let ex = FieldExchanger::new(&reg, &comm);

    let mut bad = all_fields(&reg, Centering::Cell);
    bad.insert(did(1), Section::new([4, 4, 1], 1));
    let err = ex.exchange_scalar(&[did(0)], &bad, Centering::Cell).unwrap_err();
    assert!(matches!(
        err,
        MeshHaloError::FieldShapeMismatch { expected: [5, 4, 1], found: [4, 4, 1], .. }
    ));
    assert!(err.is_fatal());

    let mut partial = all_fields(&reg, Centering::Cell);
    partial.remove(&did(1));
    assert!(matches!(
        ex.exchange_scalar(&[did(1)], &partial, Centering::Cell),
        Err(MeshHaloError::MissingField(d)) if d == did(1)
    ));
    assert!(matches!(
        ex.exchange_scalar(&[did(4)], &partial, Centering::Cell),
        Err(MeshHaloError::UnknownDomain(_))
    ));
}
