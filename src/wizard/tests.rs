//! Tests for the wizard store

use super::*;
use crate::api::properties::{DraftCreated, PropertyRecord};
use serde_json::json;

fn address(value: &str) -> FormPatch {
    FormPatch {
        adresse_complete: Some(Some(value.to_string())),
        ..Default::default()
    }
}

fn with_type(property_type: PropertyType) -> FormPatch {
    FormPatch {
        property_type: Some(Some(property_type)),
        ..Default::default()
    }
}

fn room(type_piece: &str) -> RoomPatch {
    RoomPatch {
        type_piece: Some(Some(type_piece.to_string())),
        ..Default::default()
    }
}

/// Store with some of everything set
fn dirty_store() -> WizardStore {
    let mut store = WizardStore::default();
    store.apply_created_draft(DraftCreated {
        id: "prop-1".to_string(),
        etat: "draft".to_string(),
        building_id: Some("bld-1".to_string()),
    });
    store.update_form_data(with_type(PropertyType::Immeuble));
    store.update_form_data(address("123 Rue Test"));
    store.add_room(room("chambre"));
    store.set_photos(vec![Photo::new("p1", "https://img.test/p1.jpg")]);
    store.set_pending_photo_urls(vec!["https://img.test/p2.jpg".to_string()]);
    store.set_mode(WizardMode::Fast);
    store.set_step(WizardStep::Photos);
    let ticket = store.begin_save();
    store.finish_save(ticket, SaveOutcome::Failed("offline".to_string()));
    store.undo();
    store
}

// ─── Reset ──────────────────────────────────────────────────────────────────

#[test]
fn test_new_store_matches_reset_state() {
    let store = WizardStore::default();
    let mut reset = dirty_store();
    reset.reset();

    assert_eq!(store.form_data(), reset.form_data());
    assert_eq!(store.current_step(), reset.current_step());
    assert_eq!(store.mode(), reset.mode());
}

#[test]
fn test_reset_invariants() {
    let mut store = dirty_store();
    assert!(store.can_undo());
    assert!(store.can_redo());

    store.reset();

    assert_eq!(store.property_id(), None);
    assert_eq!(store.building_id(), None);
    assert_eq!(store.current_step(), WizardStep::TypeBien);
    assert_eq!(store.mode(), WizardMode::Full);
    assert_eq!(store.sync_status(), SyncStatus::Idle);
    assert_eq!(store.form_data().etat, "draft");
    assert_eq!(store.form_data().building_floors, 4);
    assert!(store.form_data().building_units.is_empty());
    assert!(!store.form_data().has_ascenseur);
    assert!(store.rooms().is_empty());
    assert!(store.photos().is_empty());
    assert!(store.pending_photo_urls().is_empty());
    assert_eq!(store.photo_import_progress(), PhotoImportProgress::default());
    assert!(!store.can_undo());
    assert!(!store.can_redo());
}

#[test]
fn test_reset_clears_address() {
    let mut store = WizardStore::default();
    store.update_form_data(address("123 Rue Test"));
    store.reset();
    assert_eq!(store.form_data().adresse_complete, None);
}

// ─── Form data ──────────────────────────────────────────────────────────────

#[test]
fn test_update_form_data_union_of_disjoint_patches() {
    let mut store = WizardStore::default();
    store.update_form_data(address("1 Place Bellecour"));
    store.update_form_data(FormPatch {
        ville: Some(Some("Lyon".to_string())),
        code_postal: Some(Some("69002".to_string())),
        ..Default::default()
    });
    store.update_form_data(FormPatch {
        loyer_hc: Some(Some(950.0)),
        has_balcon: Some(true),
        ..Default::default()
    });
    store.update_form_data(FormPatch::extra("exposition", json!("sud")));

    let form = store.form_data();
    assert_eq!(form.adresse_complete.as_deref(), Some("1 Place Bellecour"));
    assert_eq!(form.ville.as_deref(), Some("Lyon"));
    assert_eq!(form.code_postal.as_deref(), Some("69002"));
    assert_eq!(form.loyer_hc, Some(950.0));
    assert!(form.has_balcon);
    assert_eq!(form.extra.get("exposition"), Some(&json!("sud")));
}

#[test]
fn test_update_form_data_last_write_wins() {
    let mut store = WizardStore::default();
    store.update_form_data(address("Old"));
    store.update_form_data(address("New"));
    assert_eq!(store.form_data().adresse_complete.as_deref(), Some("New"));
}

#[test]
fn test_etat_is_not_writable_through_patches() {
    let mut store = WizardStore::default();
    store.update_form_data(FormPatch::extra("etat", json!("published")));
    assert_eq!(store.form_data().etat, "draft");
}

// ─── Navigation ─────────────────────────────────────────────────────────────

#[test]
fn test_prev_step_on_first_step_is_noop() {
    let mut store = WizardStore::default();
    store.prev_step();
    assert_eq!(store.current_step(), WizardStep::TypeBien);
}

#[test]
fn test_next_step_on_last_step_is_noop() {
    let mut store = WizardStore::default();
    store.set_step(WizardStep::Recap);
    store.next_step();
    assert_eq!(store.current_step(), WizardStep::Recap);
}

#[test]
fn test_walk_default_order() {
    let mut store = WizardStore::default();
    let order = store.steps();
    for expected in order.iter().skip(1) {
        store.next_step();
        assert_eq!(store.current_step(), *expected);
    }
    for expected in order.iter().rev().skip(1) {
        store.prev_step();
        assert_eq!(store.current_step(), *expected);
    }
}

#[test]
fn test_building_branch() {
    let mut store = WizardStore::default();
    store.update_form_data(with_type(PropertyType::Immeuble));

    store.next_step();
    assert_eq!(store.current_step(), WizardStep::Address);
    store.next_step();
    assert_eq!(store.current_step(), WizardStep::BuildingConfig);
}

#[test]
fn test_unit_type_goes_to_details() {
    let mut store = WizardStore::default();
    store.update_form_data(with_type(PropertyType::Appartement));
    store.next_step();
    store.next_step();
    assert_eq!(store.current_step(), WizardStep::Details);
}

#[test]
fn test_navigation_does_not_touch_history() {
    let mut store = WizardStore::default();
    store.next_step();
    store.set_step(WizardStep::Photos);
    store.prev_step();
    store.set_mode(WizardMode::Fast);
    assert!(!store.can_undo());
}

#[test]
fn test_set_mode_changes_order_not_data() {
    let mut store = WizardStore::default();
    store.update_form_data(address("123 Rue Test"));
    let before = store.form_data().clone();

    store.set_step(WizardStep::Details);
    store.set_mode(WizardMode::Fast);
    assert_eq!(store.form_data(), &before);

    // Rooms is skipped in fast mode
    store.next_step();
    assert_eq!(store.current_step(), WizardStep::Photos);
}

#[test]
fn test_progress() {
    let mut store = WizardStore::default();
    assert_eq!(store.progress(), (1, 8));
    store.next_step();
    assert_eq!(store.progress(), (2, 8));

    store.update_form_data(with_type(PropertyType::Immeuble));
    store.set_step(WizardStep::Details);
    assert_eq!(store.progress(), (0, 7));
}

// ─── Rooms ──────────────────────────────────────────────────────────────────

#[test]
fn test_add_rooms_in_order_with_unique_ids() {
    let mut store = WizardStore::default();
    store.add_room(RoomPatch {
        type_piece: Some(Some("chambre".to_string())),
        surface_m2: Some(Some(15.0)),
        label: None,
    });
    store.add_room(room("sejour"));

    let rooms = store.rooms();
    assert_eq!(rooms.len(), 2);
    assert_eq!(rooms[0].type_piece.as_deref(), Some("chambre"));
    assert_eq!(rooms[0].surface_m2, Some(15.0));
    assert_ne!(rooms[0].id, rooms[1].id);
}

#[test]
fn test_room_ids_pairwise_distinct() {
    let mut store = WizardStore::default();
    let ids: Vec<_> = (0..100).map(|_| store.add_room(RoomPatch::default())).collect();
    let unique: std::collections::HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len());
}

#[test]
fn test_update_room_merges() {
    let mut store = WizardStore::default();
    let id = store.add_room(room("chambre"));
    assert!(store.update_room(
        id,
        RoomPatch {
            surface_m2: Some(Some(11.5)),
            ..Default::default()
        }
    ));

    let updated = store.room(id).unwrap();
    assert_eq!(updated.type_piece.as_deref(), Some("chambre"));
    assert_eq!(updated.surface_m2, Some(11.5));
}

#[test]
fn test_update_room_null_clears_field() {
    let mut store = WizardStore::default();
    let id = store.add_room(RoomPatch {
        type_piece: Some(Some("chambre".to_string())),
        surface_m2: Some(Some(12.0)),
        label: Some(Some("Chambre 1".to_string())),
    });

    let patch: RoomPatch = serde_json::from_value(json!({"label": null})).unwrap();
    assert!(store.update_room(id, patch));

    let room = store.room(id).unwrap();
    assert_eq!(room.label, None);
    assert_eq!(room.surface_m2, Some(12.0));
    assert_eq!(room.type_piece.as_deref(), Some("chambre"));
}

#[test]
fn test_remove_room_preserves_order() {
    let mut store = WizardStore::default();
    store.add_room(room("a"));
    let middle = store.add_room(room("b"));
    store.add_room(room("c"));

    assert!(store.remove_room(middle));
    let kinds: Vec<_> = store
        .rooms()
        .iter()
        .map(|r| r.type_piece.clone().unwrap())
        .collect();
    assert_eq!(kinds, vec!["a", "c"]);
}

#[test]
fn test_unknown_room_is_noop() {
    let mut store = WizardStore::default();
    store.add_room(room("a"));
    store.undo();
    assert!(store.can_redo());

    let missing = uuid::Uuid::new_v4();
    assert!(!store.update_room(missing, room("x")));
    assert!(!store.remove_room(missing));
    assert!(store.rooms().is_empty());
    // No-ops do not count as mutations
    assert!(store.can_redo());
}

// ─── Photos ─────────────────────────────────────────────────────────────────

#[test]
fn test_set_photos_replaces_sequence() {
    let mut store = WizardStore::default();
    store.set_photos(vec![Photo::new("1", "u1"), Photo::new("2", "u2")]);
    store.set_photos(vec![Photo::new("3", "u3")]);
    assert_eq!(store.photos().len(), 1);
    assert_eq!(store.photos()[0].id, "3");
}

#[test]
fn test_photo_import_progress() {
    let mut store = WizardStore::default();
    store.set_pending_photo_urls(vec!["a".to_string(), "b".to_string()]);
    assert_eq!(
        store.photo_import_progress(),
        PhotoImportProgress {
            imported: 0,
            total: 2
        }
    );

    store.record_photo_imported();
    store.record_photo_imported();
    store.record_photo_imported();
    let progress = store.photo_import_progress();
    assert_eq!(progress.imported, 2);
    assert!(progress.is_complete());
    assert_eq!(store.pending_photo_urls(), ["a", "b"]);

    store.clear_pending_photo_urls();
    assert!(store.pending_photo_urls().is_empty());
    assert_eq!(store.photo_import_progress().total, 0);
    // Import queue is not undoable state
    assert!(!store.can_undo());
}

#[test]
fn test_import_pending_photos_keeps_existing_main() {
    let mut store = WizardStore::default();
    let mut cover = Photo::new("cover", "https://img.test/cover.jpg");
    cover.is_main = true;
    store.set_photos(vec![cover]);

    store.set_pending_photo_urls(vec![
        "https://img.test/1.jpg".to_string(),
        "https://img.test/2.jpg".to_string(),
    ]);
    assert_eq!(store.import_pending_photos(), 2);

    let urls: Vec<_> = store.photos().iter().map(|p| p.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://img.test/cover.jpg",
            "https://img.test/1.jpg",
            "https://img.test/2.jpg"
        ]
    );
    assert_eq!(store.photos().iter().filter(|p| p.is_main).count(), 1);
    assert!(store.pending_photo_urls().is_empty());
    assert_eq!(store.import_pending_photos(), 0);

    // The import itself is one undoable change
    store.undo();
    assert_eq!(store.photos().len(), 1);
}

// ─── Undo / redo ────────────────────────────────────────────────────────────

#[test]
fn test_undo_redo_form_data() {
    let mut store = WizardStore::default();
    store.update_form_data(address("A"));
    let s0 = store.form_data().clone();
    store.update_form_data(address("B"));
    let s1 = store.form_data().clone();

    store.undo();
    assert_eq!(store.form_data(), &s0);
    store.redo();
    assert_eq!(store.form_data(), &s1);
}

#[test]
fn test_undo_redo_every_mutating_action() {
    let mut store = WizardStore::default();
    let room_id = store.add_room(room("chambre"));

    type Action = Box<dyn Fn(&mut WizardStore)>;
    let actions: Vec<Action> = vec![
        Box::new(|s: &mut WizardStore| s.update_form_data(address("X"))),
        Box::new(|s: &mut WizardStore| {
            s.add_room(room("cuisine"));
        }),
        Box::new(move |s: &mut WizardStore| {
            s.update_room(room_id, room("bureau"));
        }),
        Box::new(move |s: &mut WizardStore| {
            s.remove_room(room_id);
        }),
        Box::new(|s: &mut WizardStore| s.set_photos(vec![Photo::new("p", "u")])),
    ];

    for action in actions {
        let mut s = store.clone();
        let (f0, r0, p0) = (s.form_data().clone(), s.rooms().to_vec(), s.photos().to_vec());
        action(&mut s);
        let (f1, r1, p1) = (s.form_data().clone(), s.rooms().to_vec(), s.photos().to_vec());

        s.undo();
        assert_eq!((s.form_data(), s.rooms(), s.photos()), (&f0, &r0[..], &p0[..]));
        s.redo();
        assert_eq!((s.form_data(), s.rooms(), s.photos()), (&f1, &r1[..], &p1[..]));
    }
}

#[test]
fn test_new_mutation_clears_redo() {
    let mut store = WizardStore::default();
    store.update_form_data(address("A"));
    store.undo();
    assert!(store.can_redo());

    store.add_room(room("chambre"));
    assert!(!store.can_redo());
}

#[test]
fn test_undo_redo_on_empty_stacks() {
    let mut store = WizardStore::default();
    let before = store.form_data().clone();
    store.undo();
    store.redo();
    assert_eq!(store.form_data(), &before);
    assert!(!store.can_undo());
    assert!(!store.can_redo());
}

#[test]
fn test_history_limit() {
    let mut store = WizardStore::new(3);
    for i in 0..10 {
        store.update_form_data(address(&i.to_string()));
    }
    let mut undos = 0;
    while store.can_undo() {
        store.undo();
        undos += 1;
    }
    assert_eq!(undos, 3);
    assert_eq!(store.form_data().adresse_complete.as_deref(), Some("6"));
}

// ─── Remote draft ───────────────────────────────────────────────────────────

#[test]
fn test_apply_created_draft() {
    let mut store = WizardStore::default();
    store.update_form_data(address("123 Rue Test"));
    store.apply_created_draft(DraftCreated {
        id: "prop-9".to_string(),
        etat: "draft".to_string(),
        building_id: None,
    });
    assert_eq!(store.property_id(), Some("prop-9"));
    assert_eq!(store.form_data().etat, "draft");
    assert_eq!(
        store.form_data().adresse_complete.as_deref(),
        Some("123 Rue Test")
    );
}

#[test]
fn test_hydrate_from_record() {
    let mut store = WizardStore::default();
    store.update_form_data(address("stale"));
    store.set_step(WizardStep::Recap);

    let record: PropertyRecord = serde_json::from_value(json!({
        "id": "prop-3",
        "etat": "published",
        "type": "immeuble",
        "adresse_complete": "8 Quai des Chartrons",
        "building_floors": 6,
        "rooms": [],
        "proprietaire_note": "interphone HS"
    }))
    .unwrap();
    store.hydrate(record).unwrap();

    assert_eq!(store.property_id(), Some("prop-3"));
    assert_eq!(store.form_data().etat, "published");
    assert!(store.form_data().is_building());
    assert_eq!(store.form_data().building_floors, 6);
    assert_eq!(
        store.form_data().extra.get("proprietaire_note"),
        Some(&json!("interphone HS"))
    );
    assert_eq!(store.current_step(), WizardStep::TypeBien);
    assert!(!store.can_undo());
}

#[test]
fn test_hydrate_rejects_malformed_record() {
    let mut store = WizardStore::default();
    store.update_form_data(address("kept"));

    let record: PropertyRecord = serde_json::from_value(json!({
        "id": "prop-4",
        "etat": "draft",
        "building_floors": "beaucoup"
    }))
    .unwrap();
    let err = store.hydrate(record).unwrap_err();

    assert!(matches!(err, WizardError::InvalidRecord { .. }));
    assert_eq!(store.form_data().adresse_complete.as_deref(), Some("kept"));
    assert_eq!(store.property_id(), None);
}

#[test]
fn test_save_payload() {
    let mut store = WizardStore::default();
    store.update_form_data(with_type(PropertyType::Studio));
    store.add_room(room("piece_principale"));

    let payload = store.save_payload();
    assert_eq!(payload.fields.get("type"), Some(&json!("studio")));
    assert!(!payload.fields.contains_key("etat"));
    assert_eq!(payload.rooms.len(), 1);
}

#[test]
fn test_failed_save_keeps_local_state() {
    let mut store = WizardStore::default();
    store.update_form_data(address("offline edit"));

    let ticket = store.begin_save();
    assert_eq!(store.sync_status(), SyncStatus::Saving);
    store.finish_save(ticket, SaveOutcome::Failed("503".to_string()));

    assert_eq!(store.sync_status(), SyncStatus::Error);
    assert_eq!(
        store.form_data().adresse_complete.as_deref(),
        Some("offline edit")
    );
    assert!(store.can_undo());
}

#[test]
fn test_validate_current_step() {
    let mut store = WizardStore::default();
    assert_eq!(store.validate_current_step().len(), 1);
    store.update_form_data(with_type(PropertyType::Maison));
    assert!(store.validate_current_step().is_empty());
}

#[test]
fn test_step_from_str() {
    assert_eq!(
        "building_config".parse::<WizardStep>().unwrap(),
        WizardStep::BuildingConfig
    );
    assert!(matches!(
        "nope".parse::<WizardStep>(),
        Err(WizardError::UnknownStep(_))
    ));
}
