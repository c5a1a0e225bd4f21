//! Registry operation tests: id allocation, authorization, index consistency,
//! and the full two-creator scenario.

use rstest::rstest;
use tessera_core::{
    BlockId, Identity, Notification, ProjectId, RecordKind, Registry, RegistryError, Timestamp,
};

fn a() -> Identity {
    Identity::from("creator-a")
}

fn b() -> Identity {
    Identity::from("creator-b")
}

fn deployer() -> Identity {
    Identity::from("deployer")
}

fn registry() -> Registry {
    Registry::new(deployer()).expect("registry")
}

fn with_project(owner: &Identity) -> Registry {
    let mut reg = registry();
    reg.register_project(owner, Timestamp(100), "Alpha", "first project", "defi");
    reg
}

// ---------------------------------------------------------------------------
// 1. Identifier allocation
// ---------------------------------------------------------------------------

#[test]
fn project_ids_are_dense_in_call_order() {
    let mut reg = registry();
    let callers = [a(), b(), a(), b(), a()];
    let ids: Vec<ProjectId> = callers
        .iter()
        .enumerate()
        .map(|(i, caller)| {
            reg.register_project(caller, Timestamp(i as u64), "same", "", "same")
                .into_value()
        })
        .collect();

    assert_eq!(ids, (0..5).map(ProjectId).collect::<Vec<_>>());
    assert_eq!(reg.total_projects(), 5);
    assert_eq!(reg.get_projects_of(&a()), &[ProjectId(0), ProjectId(2), ProjectId(4)]);
    assert_eq!(reg.get_projects_of(&b()), &[ProjectId(1), ProjectId(3)]);
}

#[test]
fn block_ids_are_global_across_projects() {
    let mut reg = registry();
    let p0 = reg.register_project(&a(), Timestamp(1), "p0", "", "d").into_value();
    let p1 = reg.register_project(&b(), Timestamp(1), "p1", "", "d").into_value();

    let order = [p1, p0, p1, p0];
    let ids: Vec<BlockId> = order
        .iter()
        .map(|p| {
            reg.add_block(&a(), Timestamp(2), *p, "l", "ipfs://x", "t")
                .expect("add")
                .into_value()
        })
        .collect();

    assert_eq!(ids, (0..4).map(BlockId).collect::<Vec<_>>());
    assert_eq!(reg.total_blocks(), 4);
    assert_eq!(reg.get_blocks_of_project(p0).unwrap(), &[BlockId(1), BlockId(3)]);
    assert_eq!(reg.get_blocks_of_project(p1).unwrap(), &[BlockId(0), BlockId(2)]);
}

#[test]
fn counters_include_inactive_records() {
    let mut reg = with_project(&a());
    reg.add_block(&a(), Timestamp(2), ProjectId(0), "l", "u", "t").unwrap();
    reg.set_block_active(&a(), Timestamp(3), BlockId(0), false).unwrap();
    reg.set_project_active(&a(), Timestamp(3), ProjectId(0), false).unwrap();

    assert_eq!(reg.total_projects(), 1);
    assert_eq!(reg.total_blocks(), 1);
    assert_eq!(reg.projects().count(), 1);
}

// ---------------------------------------------------------------------------
// 2. Guards
// ---------------------------------------------------------------------------

#[rstest]
#[case::creator_adds(a())]
#[case::stranger_adds(b())]
fn add_block_to_inactive_project_fails(#[case] caller: Identity) {
    let mut reg = with_project(&a());
    reg.set_project_active(&a(), Timestamp(2), ProjectId(0), false).unwrap();

    let err = reg
        .add_block(&caller, Timestamp(3), ProjectId(0), "l", "u", "t")
        .unwrap_err();
    assert_eq!(err, RegistryError::InactiveParent { project_id: ProjectId(0) });
    assert_eq!(reg.total_blocks(), 0);
}

#[test]
fn reactivated_project_accepts_blocks_again() {
    let mut reg = with_project(&a());
    reg.set_project_active(&a(), Timestamp(2), ProjectId(0), false).unwrap();
    reg.set_project_active(&a(), Timestamp(3), ProjectId(0), true).unwrap();
    assert!(reg.add_block(&b(), Timestamp(4), ProjectId(0), "l", "u", "t").is_ok());
}

#[rstest]
#[case::other_creator(b())]
#[case::registry_owner(deployer())]
#[case::empty_identity(Identity::empty())]
fn non_creator_cannot_toggle_project(#[case] caller: Identity) {
    let mut reg = with_project(&a());
    let err = reg
        .set_project_active(&caller, Timestamp(2), ProjectId(0), false)
        .unwrap_err();
    assert!(matches!(err, RegistryError::Unauthorized { .. }), "got: {err}");
    assert!(reg.project(ProjectId(0)).unwrap().is_active);
}

#[rstest]
#[case::project_creator(a())]
#[case::registry_owner(deployer())]
fn non_creator_cannot_toggle_block(#[case] caller: Identity) {
    let mut reg = with_project(&a());
    reg.add_block(&b(), Timestamp(2), ProjectId(0), "Audit", "u", "audit").unwrap();

    let err = reg
        .set_block_active(&caller, Timestamp(3), BlockId(0), false)
        .unwrap_err();
    assert!(matches!(err, RegistryError::Unauthorized { .. }), "got: {err}");
    assert!(reg.block(BlockId(0)).unwrap().is_active);
}

#[test]
fn missing_records_report_not_found() {
    let mut reg = registry();
    assert_eq!(
        reg.set_project_active(&a(), Timestamp(1), ProjectId(3), true).unwrap_err(),
        RegistryError::NotFound { kind: RecordKind::Project, id: 3 }
    );
    assert_eq!(
        reg.set_block_active(&a(), Timestamp(1), BlockId(0), true).unwrap_err(),
        RegistryError::NotFound { kind: RecordKind::Block, id: 0 }
    );
    assert_eq!(
        reg.add_block(&a(), Timestamp(1), ProjectId(0), "l", "u", "t").unwrap_err(),
        RegistryError::NotFound { kind: RecordKind::Project, id: 0 }
    );
    assert_eq!(
        reg.get_blocks_of_project(ProjectId(0)).unwrap_err(),
        RegistryError::NotFound { kind: RecordKind::Project, id: 0 }
    );
}

#[test]
fn not_found_takes_precedence_over_authorization() {
    let mut reg = with_project(&a());
    let err = reg
        .set_project_active(&b(), Timestamp(1), ProjectId(1), false)
        .unwrap_err();
    assert!(matches!(err, RegistryError::NotFound { .. }));
}

#[test]
fn index_queries_for_unknown_creator_are_empty() {
    let reg = with_project(&a());
    assert!(reg.get_projects_of(&b()).is_empty());
    assert!(reg.get_blocks_of(&b()).is_empty());
    assert!(reg.get_projects_of(&Identity::empty()).is_empty());
}

// ---------------------------------------------------------------------------
// 3. Index consistency
// ---------------------------------------------------------------------------

#[test]
fn new_block_is_appended_once_to_both_indexes() {
    let mut reg = with_project(&a());
    reg.add_block(&a(), Timestamp(2), ProjectId(0), "Spec", "u", "architecture").unwrap();
    let id = reg
        .add_block(&b(), Timestamp(3), ProjectId(0), "Audit", "u", "audit")
        .unwrap()
        .into_value();

    let by_project = reg.get_blocks_of_project(ProjectId(0)).unwrap();
    assert_eq!(by_project.last(), Some(&id));
    assert_eq!(by_project.iter().filter(|b| **b == id).count(), 1);

    let by_caller = reg.get_blocks_of(&b());
    assert_eq!(by_caller.last(), Some(&id));
    assert_eq!(by_caller.iter().filter(|b| **b == id).count(), 1);
}

#[test]
fn deactivating_project_does_not_cascade() {
    let mut reg = with_project(&a());
    reg.add_block(&a(), Timestamp(2), ProjectId(0), "Spec", "u", "t").unwrap();
    reg.add_block(&b(), Timestamp(2), ProjectId(0), "Audit", "u", "t").unwrap();
    reg.set_block_active(&b(), Timestamp(3), BlockId(1), false).unwrap();
    let before: Vec<BlockId> = reg.get_blocks_of_project(ProjectId(0)).unwrap().to_vec();

    reg.set_project_active(&a(), Timestamp(4), ProjectId(0), false).unwrap();

    assert_eq!(reg.get_blocks_of_project(ProjectId(0)).unwrap(), before.as_slice());
    assert!(reg.block(BlockId(0)).unwrap().is_active);
    assert!(!reg.block(BlockId(1)).unwrap().is_active);
}

#[test]
fn block_stays_indexed_after_deactivation() {
    let mut reg = with_project(&a());
    reg.add_block(&a(), Timestamp(2), ProjectId(0), "Spec", "u", "t").unwrap();
    reg.set_block_active(&a(), Timestamp(3), BlockId(0), false).unwrap();
    assert_eq!(reg.get_blocks_of(&a()), &[BlockId(0)]);
    assert_eq!(reg.get_blocks_of_project(ProjectId(0)).unwrap(), &[BlockId(0)]);
}

// ---------------------------------------------------------------------------
// 4. Ownership
// ---------------------------------------------------------------------------

#[test]
fn transfer_to_empty_identity_fails() {
    let mut reg = registry();
    let err = reg
        .transfer_ownership(&deployer(), Timestamp(1), Identity::empty())
        .unwrap_err();
    assert_eq!(err, RegistryError::InvalidArgument { field: "new_owner" });
    assert_eq!(reg.owner(), &deployer());
}

#[test]
fn only_current_owner_can_transfer() {
    let mut reg = registry();
    assert!(matches!(
        reg.transfer_ownership(&a(), Timestamp(1), a()),
        Err(RegistryError::Unauthorized { .. })
    ));

    let receipt = reg.transfer_ownership(&deployer(), Timestamp(2), a()).unwrap();
    assert_eq!(
        receipt.event.notification,
        Notification::OwnershipTransferred { previous_owner: deployer(), new_owner: a() }
    );
    assert_eq!(reg.owner(), &a());

    // The previous owner has lost the role.
    assert!(reg.transfer_ownership(&deployer(), Timestamp(3), b()).is_err());
    assert!(reg.transfer_ownership(&a(), Timestamp(3), b()).is_ok());
}

// ---------------------------------------------------------------------------
// 5. Notifications
// ---------------------------------------------------------------------------

#[test]
fn receipts_carry_caller_clock_and_event_fields() {
    let mut reg = registry();
    let project = reg.register_project(&a(), Timestamp(10), "Alpha", "d", "defi");
    assert_eq!(project.event.caller, a());
    assert_eq!(project.event.clock, Timestamp(10));
    assert_eq!(
        project.event.notification,
        Notification::ProjectRegistered {
            project_id: ProjectId(0),
            creator: a(),
            name: "Alpha".into(),
            domain: "defi".into(),
            created_at: Timestamp(10),
        }
    );

    let block = reg
        .add_block(&b(), Timestamp(11), ProjectId(0), "Audit", "ipfs://q", "audit")
        .unwrap();
    assert_eq!(
        block.event.notification,
        Notification::BlockAdded {
            block_id: BlockId(0),
            project_id: ProjectId(0),
            creator: b(),
            label: "Audit".into(),
            tag: "audit".into(),
            timestamp: Timestamp(11),
        }
    );

    let toggled = reg.set_block_active(&b(), Timestamp(12), BlockId(0), false).unwrap();
    assert_eq!(toggled.event.caller, b());
    assert_eq!(
        toggled.event.notification,
        Notification::BlockStatusUpdated {
            block_id: BlockId(0),
            is_active: false,
            timestamp: Timestamp(12),
        }
    );
}

// ---------------------------------------------------------------------------
// 6. End-to-end scenario
// ---------------------------------------------------------------------------

#[test]
fn two_creators_share_a_project() {
    let mut reg = registry();

    let alpha = reg
        .register_project(&a(), Timestamp(1), "Alpha", "", "defi")
        .into_value();
    assert_eq!(alpha, ProjectId(0));

    let spec = reg
        .add_block(&a(), Timestamp(2), alpha, "Spec", "ipfs://spec", "architecture")
        .unwrap()
        .into_value();
    assert_eq!(spec, BlockId(0));
    assert_eq!(reg.get_blocks_of_project(alpha).unwrap(), &[BlockId(0)]);

    let audit = reg
        .add_block(&b(), Timestamp(3), alpha, "Audit", "ipfs://audit", "audit")
        .unwrap()
        .into_value();
    assert_eq!(audit, BlockId(1));
    assert_eq!(reg.get_blocks_of_project(alpha).unwrap(), &[BlockId(0), BlockId(1)]);
    assert_eq!(reg.get_blocks_of(&b()), &[BlockId(1)]);

    reg.set_project_active(&a(), Timestamp(4), alpha, false).unwrap();

    assert_eq!(
        reg.add_block(&b(), Timestamp(5), alpha, "Late", "ipfs://late", "misc").unwrap_err(),
        RegistryError::InactiveParent { project_id: alpha }
    );

    reg.set_block_active(&b(), Timestamp(6), audit, false).unwrap();
    assert!(!reg.block(audit).unwrap().is_active);

    assert!(matches!(
        reg.set_block_active(&a(), Timestamp(7), audit, true),
        Err(RegistryError::Unauthorized { .. })
    ));
    assert!(!reg.block(audit).unwrap().is_active);
}
