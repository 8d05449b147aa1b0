mod common;

use common::{boxes, coarse_config, cube, fine_config};
use raster_slicer::pipeline::SliceState;
use raster_slicer::{
    BoundingBoxF, CancellationToken, Pass, SliceOutcome, SliceSession, ToolpathElement,
    ToolpathRole, Vec3,
};

fn role_bounds(session: &SliceSession, layer: usize, role: ToolpathRole) -> BoundingBoxF {
    let mut bb = BoundingBoxF::new();
    let layer = session.toolpath().layer(layer).unwrap();
    for tp in layer.role(role) {
        for e in &tp.elements {
            if let ToolpathElement::Motion {
                start,
                end,
                rapid: false,
            } = *e
            {
                bb.merge_point(start);
                bb.merge_point(end);
            }
        }
    }
    bb
}

#[test]
fn test_cube_end_to_end() {
    let mut session = SliceSession::new(fine_config()).unwrap();
    session.load_mesh(cube(20.0));
    let mut events = 0;
    let outcome = session
        .run(&CancellationToken::new(), |_| events += 1)
        .unwrap();

    assert_eq!(outcome, SliceOutcome::Completed);
    assert_eq!(session.state(), SliceState::Done);
    assert_eq!(session.layer_count(), 100);
    assert_eq!(events, 200);

    let summaries = session.summaries();
    assert_eq!(summaries.len(), 100);
    for s in summaries {
        assert_eq!(s.rims, 1, "layer {}", s.index);
        assert_eq!(s.open_rims, 0);
        assert_eq!(s.shells, 2);
        assert_eq!(s.model_pixels, 200 * 200);
        assert_eq!(s.interior_pixels, 184 * 184);
    }

    // Full lids on the first and last layers, sparse infill in the middle.
    for i in [0, 1, 2, 97, 98, 99] {
        assert_eq!(summaries[i].lid_pixels, summaries[i].interior_pixels);
        assert_eq!(summaries[i].infill_pixels, 0);
    }
    assert_eq!(summaries[50].lid_pixels, 0);
    assert_eq!(summaries[50].infill_pixels, summaries[50].interior_pixels);

    // Outer shell is the 20 mm outline inset by half a nozzle width.
    let shell = role_bounds(&session, 50, ToolpathRole::Shell);
    assert!((shell.width() - 19.6).abs() < 0.05);
    assert!((shell.height() - 19.6).abs() < 0.05);
    assert!((shell.min.x - 10.2).abs() < 0.05);

    // Lid strokes stay inside the interior.
    let lid = role_bounds(&session, 0, ToolpathRole::Lid);
    assert!(lid.min.x >= 10.8 - 1e-6 && lid.max.x <= 29.2 + 1e-6);

    // The skirt only exists on the first layer, outside the model.
    let skirt = role_bounds(&session, 0, ToolpathRole::Skirt);
    assert!(skirt.defined);
    assert!(skirt.min.x < 10.0 && skirt.max.x > 30.0);
    assert_eq!(
        session
            .toolpath()
            .layer(1)
            .unwrap()
            .role(ToolpathRole::Skirt)
            .count(),
        0
    );

    let stats = session.toolpath().stats();
    assert_eq!(stats.layers, 100);
    assert!(stats.print_length > 100.0 * 4.0 * 19.0);
}

#[test]
fn test_cancel_after_three_layers() {
    let mut session = SliceSession::new(coarse_config()).unwrap();
    session.load_mesh(cube(10.0));
    let mut progress = Vec::new();
    let cancel = CancellationToken::after_checkpoints(3);
    let outcome = session.run(&cancel, |p| progress.push(p)).unwrap();

    assert_eq!(
        outcome,
        SliceOutcome::Canceled {
            pass: Pass::Shells,
            layers: 3
        }
    );
    assert!(cancel.is_cancelled());
    assert_eq!(session.state(), SliceState::Canceled);
    assert_eq!(progress.len(), 3);
    assert_eq!(progress[2].layer, 2);
    assert_eq!(progress[2].total, 10);
    assert_eq!(session.cached_layer_count(), 3);
    assert_eq!(session.summaries().len(), 3);

    session.purge();
    assert_eq!(session.state(), SliceState::Idle);
    assert_eq!(session.cached_layer_count(), 0);
}

#[test]
fn test_cancel_from_callback() {
    let mut session = SliceSession::new(coarse_config()).unwrap();
    session.load_mesh(cube(10.0));
    let cancel = CancellationToken::new();
    let handle = cancel.clone();
    let outcome = session
        .run(&cancel, |p| {
            if p.pass == Pass::LidsAndInfill && p.layer == 4 {
                handle.cancel();
            }
        })
        .unwrap();
    assert_eq!(
        outcome,
        SliceOutcome::Canceled {
            pass: Pass::LidsAndInfill,
            layers: 5
        }
    );
    // Layers already done keep their toolpaths.
    let layer = session.toolpath().layer(4).unwrap();
    assert!(layer.role(ToolpathRole::Infill).count() > 0);
}

#[test]
fn test_support_under_overhang() {
    let config = coarse_config()
        .auto_center(false)
        .support(true)
        .support_angle(45.0);
    let mut session = SliceSession::new(config).unwrap();
    // A pillar carrying a wide slab.
    session.load_mesh(boxes(&[
        (Vec3::new(18.0, 18.0, 0.0), Vec3::new(22.0, 22.0, 10.0)),
        (Vec3::new(12.0, 12.0, 10.0), Vec3::new(28.0, 28.0, 12.0)),
    ]));
    session.run(&CancellationToken::new(), |_| {}).unwrap();

    let summaries = session.summaries();
    assert_eq!(summaries.len(), 12);
    let slab_pixels = 40 * 40;
    for s in &summaries[..8] {
        assert!(s.support_pixels > 0, "layer {}", s.index);
        assert!(s.support_pixels < slab_pixels);
    }
    for s in &summaries[10..] {
        assert_eq!(s.support_pixels, 0);
    }

    let support = role_bounds(&session, 3, ToolpathRole::Support);
    assert!(support.min.x >= 12.0 - 1e-6 && support.max.x <= 28.0 + 1e-6);
    assert!(support.width() > 8.0);
}
