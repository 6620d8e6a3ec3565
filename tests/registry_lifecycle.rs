mod util;
use util::*;

use mesh_halo::prelude::*;

const PAIR: [[i32; 6]; 2] = [[0, 4, 0, 4, 0, 0], [4, 8, 0, 4, 0, 0]];

fn declared(cfg: BoundaryConfig, extents: &[[i32; 6]]) -> BoundaryRegistry {
    let mut reg = BoundaryRegistry::new(cfg).unwrap();
    reg.set_num_domains(extents.len()).unwrap();
    for (i, e) in extents.iter().enumerate() {
        reg.set_extents(did(i), ext(*e)).unwrap();
    }
    reg
}

#[test]
fn queries_require_finished_domains() {
    let mut reg = declared(BoundaryConfig::default(), &PAIR);
    assert_eq!(reg.state(did(0)).unwrap(), DomainState::ExtentsSet);
    assert!(matches!(
        reg.neighbors(did(0)),
        Err(MeshHaloError::NotFinished(d)) if d == did(0)
    ));
    assert!(matches!(
        reg.neighbors(did(7)),
        Err(MeshHaloError::UnknownDomain(_))
    ));
    assert!(reg.domain(did(0)).is_err());

    reg.calculate_boundaries().unwrap();
    assert_eq!(reg.state(did(0)).unwrap(), DomainState::Finished);
    assert_eq!(reg.finished_domains(), vec![did(0), did(1)]);
}

#[test]
fn finalized_registry_rejects_global_resets() {
    let mut reg = registry(&PAIR);
    assert!(matches!(
        reg.set_num_domains(4),
        Err(MeshHaloError::DomainsFinalized)
    ));
    assert!(matches!(
        reg.set_refinement_ratios(vec![[2, 2, 2]]),
        Err(MeshHaloError::DomainsFinalized)
    ));
    assert!(matches!(
        reg.set_frame(did(0), AxisTransform::IDENTITY),
        Err(MeshHaloError::AlreadyFinished(_))
    ));
}

#[test]
fn declaration_errors_are_reported() {
    let mut reg = BoundaryRegistry::new(BoundaryConfig::default()).unwrap();
    reg.set_num_domains(2).unwrap();
    let err = reg
        .set_extents(did(0), ext([4, 0, 0, 4, 0, 0]))
        .unwrap_err();
    assert!(matches!(err, MeshHaloError::InvalidExtents { .. }));
    assert!(err.is_fatal());
    assert!(matches!(
        reg.set_owner(did(1), 3),
        Err(MeshHaloError::MissingExtents(_))
    ));
    assert!(matches!(
        reg.set_refinement_ratios(vec![[2, 0, 1]]),
        Err(MeshHaloError::InvalidRefinementRatio { .. })
    ));
}

#[test]
fn moving_a_domain_unfinishes_its_partners() {
    let mut reg = registry(&PAIR);
    reg.set_extents(did(1), ext([4, 9, 0, 4, 0, 0])).unwrap();

    assert_eq!(reg.state(did(1)).unwrap(), DomainState::ExtentsSet);
    assert_eq!(reg.state(did(0)).unwrap(), DomainState::NeighborsDiscovered);
    assert_eq!(reg.old_extents(did(1)).unwrap(), Some(ext(PAIR[1])));
    assert_eq!(reg.new_extents(did(1)).unwrap(), Some(ext([4, 9, 0, 4, 0, 0])));

    // domain 0 still holds links built against the old extents of domain 1
    let err = reg.finish(did(0)).unwrap_err();
    assert!(matches!(
        err,
        MeshHaloError::InconsistentExtents { domain, .. } if domain == did(1)
    ));

    reg.calculate_boundaries().unwrap();
    let link = &reg.neighbors(did(0)).unwrap()[0];
    assert_eq!(link.partner_extents, ext([4, 9, 0, 4, 0, 0]));
    assert_eq!(reg.old_extents(did(1)).unwrap(), reg.new_extents(did(1)).unwrap());
}

#[test]
fn redeclaring_identical_extents_keeps_state() {
    let mut reg = registry(&PAIR);
    reg.set_extents(did(1), ext(PAIR[1])).unwrap();
    assert_eq!(reg.state(did(0)).unwrap(), DomainState::Finished);
    assert_eq!(reg.state(did(1)).unwrap(), DomainState::Finished);
}

#[test]
fn explicit_neighbors_are_built_and_frozen() {
    let cfg = BoundaryConfig {
        compute_neighbors_from_extents: false,
        ..Default::default()
    };
    let mut reg = declared(cfg, &PAIR);
    let seam = ext([4, 4, 0, 4, 0, 0]);
    reg.add_neighbor(did(0), NeighborSpec::same_level(did(1), seam))
        .unwrap();
    reg.add_neighbor(did(1), NeighborSpec::same_level(did(0), seam))
        .unwrap();
    assert_eq!(reg.state(did(0)).unwrap(), DomainState::NeighborsDiscovered);
    reg.finish(did(0)).unwrap();
    reg.finish(did(1)).unwrap();

    let ab = &reg.neighbors(did(0)).unwrap()[0];
    let ba = &reg.neighbors(did(1)).unwrap()[0];
    assert_eq!(ab.contact, Contact::Face(Face::IMax));
    assert_eq!(ba.contact, Contact::Face(Face::IMin));
    assert_eq!(ab.overlap_cells.unwrap().to_array(), [4, 4, 0, 3, 0, 0]);

    assert!(matches!(
        reg.add_neighbor(did(0), NeighborSpec::same_level(did(1), seam)),
        Err(MeshHaloError::AlreadyFinished(_))
    ));
}

#[test]
fn explicit_link_on_moved_domain_fails_to_finish() {
    let mut reg = declared(BoundaryConfig::default(), &PAIR);
    reg.add_neighbor(did(0), NeighborSpec::same_level(did(1), ext([4, 4, 0, 4, 0, 0])))
        .unwrap();
    reg.set_extents(did(0), ext([0, 3, 0, 4, 0, 0])).unwrap();
    let err = reg.finish(did(0)).unwrap_err();
    assert!(matches!(
        err,
        MeshHaloError::InconsistentExtents { domain, old, new }
            if domain == did(0) && old == ext(PAIR[0]) && new == ext([0, 3, 0, 4, 0, 0])
    ));
}

#[test]
fn candidate_lists_restrict_discovery() {
    let cfg = BoundaryConfig {
        compute_neighbors_from_extents: false,
        ..Default::default()
    };
    let mut reg = declared(
        cfg,
        &[[0, 4, 0, 4, 0, 0], [4, 8, 0, 4, 0, 0], [8, 12, 0, 4, 0, 0]],
    );
    reg.set_neighbor_candidates(did(0), vec![did(1)]).unwrap();
    assert!(reg.set_neighbor_candidates(did(1), vec![did(9)]).is_err());
    reg.calculate_boundaries().unwrap();

    assert_eq!(reg.neighbors(did(0)).unwrap().len(), 1);
    assert_eq!(reg.neighbors(did(1)).unwrap().len(), 1);
    assert!(reg.neighbors(did(2)).unwrap().is_empty());
}

#[test]
fn deleting_a_nested_link_removes_its_mirror() {
    let mut reg = amr_registry([2, 2, 1], &[[0, 8, 0, 8, 0, 0]], &[[4, 8, 4, 8, 0, 0]]);
    let coarse = reg.neighbors(did(0)).unwrap();
    assert_eq!(coarse.len(), 1);
    assert_eq!(coarse[0].contact, Contact::Nested);
    assert_eq!(coarse[0].relationship, NeighborRelationship::Donor);

    assert_eq!(reg.delete_neighbor(did(0), &[did(1)]).unwrap(), 1);
    assert_eq!(reg.record_of(did(0)).unwrap().links().len(), 0);
    assert_eq!(reg.record_of(did(1)).unwrap().links().len(), 0);
    assert_eq!(reg.state(did(0)).unwrap(), DomainState::NeighborsDiscovered);
    assert_eq!(reg.state(did(1)).unwrap(), DomainState::NeighborsDiscovered);

    reg.finish(did(0)).unwrap();
    reg.finish(did(1)).unwrap();
    assert!(reg.neighbors(did(1)).unwrap().is_empty());
}

#[test]
fn deleting_a_face_link_keeps_the_partner_side() {
    let mut reg = registry(&PAIR);
    assert_eq!(reg.delete_neighbor(did(0), &[did(1)]).unwrap(), 1);
    assert_eq!(reg.delete_neighbor(did(0), &[did(1)]).unwrap(), 0);
    assert_eq!(reg.state(did(1)).unwrap(), DomainState::Finished);
    assert_eq!(reg.neighbors(did(1)).unwrap().len(), 1);
    assert!(reg.delete_neighbor(did(0), &[did(5)]).is_err());
}

#[test]
fn neighbor_presence_reports_faces_and_partners() {
    let reg = registry(&[[0, 4, 0, 4, 0, 0], [4, 8, 0, 4, 0, 0], [0, 4, 4, 8, 0, 0]]);
    let (faces, related) = reg.get_neighbor_presence(did(0)).unwrap();
    assert_eq!(faces, [false, true, false, true, false, false]);
    assert_eq!(related, vec![did(1), did(2)]);

    let (faces, related) = reg.get_neighbor_presence(did(2)).unwrap();
    assert_eq!(faces, [false, false, true, false, false, false]);
    // domain 1 touches domain 2 at a single corner point
    assert_eq!(related, vec![did(0), did(1)]);
}

#[test]
fn reset_forgets_links_but_keeps_declarations() {
    let mut reg = registry(&PAIR);
    reg.reset_cached_members();
    assert_eq!(reg.state(did(0)).unwrap(), DomainState::ExtentsSet);
    assert!(reg.neighbors(did(0)).is_err());
    assert_eq!(reg.new_extents(did(0)).unwrap(), Some(ext(PAIR[0])));

    reg.calculate_boundaries().unwrap();
    assert_eq!(reg.neighbors(did(0)).unwrap().len(), 1);
}

#[test]
fn communication_needs_follow_links() {
    let lone = registry(&[[0, 4, 0, 4, 0, 0]]);
    assert!(!lone.requires_communication(GhostDataType::GhostZones));
    assert!(!lone.requires_communication(GhostDataType::GhostNodes));

    let pair = registry(&PAIR);
    assert!(pair.requires_communication(GhostDataType::GhostZones));
    assert!(pair.requires_communication(GhostDataType::GhostNodes));
    assert!(!pair.requires_communication(GhostDataType::DuplicateNodes));

    let nested = amr_registry([2, 2, 1], &[[0, 8, 0, 8, 0, 0]], &[[4, 8, 4, 8, 0, 0]]);
    assert!(nested.requires_communication(GhostDataType::GhostZones));
    // the fine patch takes its ghost nodes from the parent's nodes
    assert!(nested.requires_communication(GhostDataType::GhostNodes));
}
