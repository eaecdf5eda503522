// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end mesh behavior through the public engine API.

use std::cell::Cell;
use std::rc::Rc;

use approx::assert_relative_eq;
use surfmesh_engine::{
    ClientId, EngineConfig, Error, Mesh, MeshEngine, MeshEvent, MeshOptions, MeshSnapshot,
    MeshType, Point2, TableStore, Triangle, VectorStore,
};
use surfmesh_core::{TraceEvent, TraceMask};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn engine() -> MeshEngine {
    init_tracing();
    MeshEngine::with_config(
        TableStore::new(),
        VectorStore::new(),
        EngineConfig {
            max_points: 100_000,
            warn_duplicates: true,
        },
    )
}

fn opts(x: &str, y: &str) -> MeshOptions {
    MeshOptions::new().x(x).unwrap().y(y).unwrap()
}

/// Counts `Changed` events delivered to a fresh notifier.
fn watch(mesh: &Mesh) -> Rc<Cell<usize>> {
    let count = Rc::new(Cell::new(0));
    let c = Rc::clone(&count);
    mesh.add_notifier(
        ClientId(1),
        Rc::new(move |_: &Mesh, event: MeshEvent| {
            if event == MeshEvent::Changed {
                c.set(c.get() + 1);
            }
        }),
    );
    count
}

#[test]
fn regular_grid_three_by_two() {
    let engine = engine();
    let mesh = engine.create_mesh("grid", MeshType::Regular).unwrap();
    mesh.configure(&opts("0 2 3", "0 1 2")).unwrap();

    assert_eq!(mesh.num_vertices(), 6);
    assert_eq!(mesh.num_triangles(), 4);
    assert_eq!(mesh.hull(), vec![0, 2, 5, 3]);
    let corners = mesh.hull_points();
    assert_eq!(corners[2], Point2::new(2.0, 1.0));
    let vertices = mesh.vertices();
    assert_relative_eq!(vertices[1].x, 1.0);
    assert_relative_eq!(vertices[4].y, 1.0);
}

#[test]
fn regular_grid_rejects_degenerate_axes() {
    let engine = engine();
    let mesh = engine.create_mesh("grid", MeshType::Regular).unwrap();
    assert!(mesh.configure(&opts("0 2 1", "0 1 2")).is_err());
    assert!(mesh.configure(&opts("0 2 3", "1 1 2")).is_err());
    assert!(mesh.configure(&opts("0 2", "0 1 2")).is_err());
    assert_eq!(mesh.num_vertices(), 0);
}

#[test]
fn cloud_duplicates_are_dropped_consistently() {
    let engine = engine();
    let mesh = engine.create_mesh("cloud", MeshType::Cloud).unwrap();
    mesh.configure(&opts("0 0 1", "0 0 1")).unwrap();
    assert_eq!(mesh.num_vertices(), 2);
    let first = mesh.vertices();

    mesh.recompute().unwrap();
    assert_eq!(mesh.vertices(), first);
    assert_eq!(mesh.num_triangles(), 0);
}

#[test]
fn hiding_is_idempotent() {
    let engine = engine();
    let mesh = engine.create_mesh("m", MeshType::Irregular).unwrap();
    mesh.configure(&opts("0 1 2 3", "0 1 2")).unwrap();
    let all = mesh.triangles();
    let n = all.len();
    assert_eq!(n, 12);

    mesh.configure(&MeshOptions::new().hide("0").unwrap()).unwrap();
    assert_eq!(mesh.num_triangles(), n - 1);
    assert_eq!(mesh.triangles(), all[1..].to_vec());

    mesh.configure(&MeshOptions::new().hide("0").unwrap()).unwrap();
    assert_eq!(mesh.num_triangles(), n - 1);
    assert_eq!(mesh.hidden(), vec![0]);

    mesh.configure(&MeshOptions::new().hide("").unwrap()).unwrap();
    assert_eq!(mesh.num_triangles(), n);
}

#[test]
fn regular_grid_hides_by_ordinal() {
    let engine = engine();
    let mesh = engine.create_mesh("grid", MeshType::Regular).unwrap();
    let options = opts("0 2 3", "0 1 2").hide("1 2").unwrap();
    mesh.configure(&options).unwrap();
    assert_eq!(mesh.num_triangles(), 2);
}

#[test]
fn triangle_mesh_uses_one_based_triples() {
    let engine = engine();
    let mesh = engine.create_mesh("tri", MeshType::Triangle).unwrap();
    let options = opts("0 1 1 0", "0 0 1 1").triangles("1 2 3 1 3 4").unwrap();
    mesh.configure(&options).unwrap();
    assert_eq!(
        mesh.triangles(),
        vec![Triangle::new(0, 1, 2), Triangle::new(0, 2, 3)]
    );
    assert_eq!(mesh.hull().len(), 4);
}

#[test]
fn triangle_index_out_of_range_keeps_previous_list() {
    let engine = engine();
    let mesh = engine.create_mesh("tri", MeshType::Triangle).unwrap();
    let changes = watch(&mesh);
    mesh.configure(&opts("0 1 0", "0 0 1").triangles("1 2 3").unwrap())
        .unwrap();
    assert_eq!(changes.get(), 1);

    let err = mesh
        .configure(&MeshOptions::new().triangles("1 2 4").unwrap())
        .unwrap_err();
    assert!(err.to_string().contains("third"), "{}", err);
    assert_eq!(mesh.triangles(), vec![Triangle::new(0, 1, 2)]);
    assert_eq!(mesh.requested_triangles(), vec![Triangle::new(0, 1, 2)]);
    assert_eq!(changes.get(), 1);

    assert!(mesh
        .configure(&MeshOptions::new().triangles("1 2").unwrap())
        .is_err());
    assert!(mesh
        .configure(&MeshOptions::new().triangles("0 1 2").unwrap())
        .is_err());
    assert_eq!(mesh.requested_triangles(), vec![Triangle::new(0, 1, 2)]);
}

#[test]
fn table_writes_coalesce_into_one_recompute() {
    let engine = engine();
    engine.tables().create_table("t").unwrap();
    let table = engine.tables().open("t").unwrap();
    let x = table.create_column("x");
    let y = table.create_column("y");
    table.extend_rows(3);
    for (row, (xv, yv)) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)].into_iter().enumerate() {
        table.set_double(row, x, xv).unwrap();
        table.set_double(row, y, yv).unwrap();
    }

    let mesh = engine.create_mesh("m", MeshType::Cloud).unwrap();
    mesh.configure(&opts("t x", "t y")).unwrap();
    assert_eq!(mesh.num_triangles(), 1);
    let changes = watch(&mesh);

    table.set_double(1, x, 4.0).unwrap();
    table.set_double(2, y, 4.0).unwrap();
    assert!(mesh.is_config_pending());
    assert_eq!(engine.pending_tasks(), 1);
    assert_eq!(changes.get(), 0);

    assert!(engine.run_idle().is_empty());
    assert_eq!(changes.get(), 1);
    assert!(!mesh.is_config_pending());
    let extents = mesh.extents().unwrap();
    assert_relative_eq!(extents.x_max, 4.0);
    assert_relative_eq!(extents.y_max, 4.0);

    assert!(engine.run_idle().is_empty());
    assert_eq!(changes.get(), 1);
}

#[test]
fn read_trace_that_writes_the_column_defers_a_recompute() {
    let engine = engine();
    engine.tables().create_table("t").unwrap();
    let table = engine.tables().open("t").unwrap();
    let x = table.create_column("x");
    table.extend_rows(3);
    for (row, xv) in [0.0, 1.0, 0.0].into_iter().enumerate() {
        table.set_double(row, x, xv).unwrap();
    }

    let mesh = engine.create_mesh("m", MeshType::Cloud).unwrap();
    mesh.configure(&opts("t x", "0 0 1")).unwrap();
    assert!(!mesh.is_config_pending());

    // A lazily filled column: every read rewrites row 1.
    let writer = table.clone();
    let fill = table
        .create_column_trace(
            x,
            TraceMask::READS,
            Rc::new(move |_: &TraceEvent| {
                writer.set_double(1, x, 2.0).unwrap();
            }),
        )
        .unwrap();

    mesh.recompute().unwrap();
    assert_eq!(mesh.vertices()[1], Point2::new(2.0, 0.0));
    assert!(mesh.is_config_pending());
    assert_eq!(engine.pending_tasks(), 1);

    table.delete_trace(fill);
    assert!(engine.run_idle().is_empty());
    assert!(!mesh.is_config_pending());
}

#[test]
fn failed_deferred_recompute_is_reported() {
    let engine = engine();
    engine.vectors().create("xs", vec![0.0, 1.0, 0.0]).unwrap();
    let mesh = engine.create_mesh("m", MeshType::Cloud).unwrap();
    mesh.configure(&opts("xs", "0 0 1")).unwrap();
    let before = mesh.vertices();

    engine.vectors().set("xs", vec![0.0, f64::NAN, 0.0]).unwrap();
    let errors = engine.run_idle();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], Error::NonFinite { .. }));
    assert_eq!(mesh.vertices(), before);
}

#[test]
fn columns_from_one_table_share_a_handle() {
    let engine = engine();
    engine.tables().create_table("t").unwrap();
    {
        let table = engine.tables().open("t").unwrap();
        let x = table.create_column("x");
        let y = table.create_column("y");
        table.extend_rows(3);
        for (row, (xv, yv)) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)].into_iter().enumerate() {
            table.set_double(row, x, xv).unwrap();
            table.set_double(row, y, yv).unwrap();
        }
    }
    let mesh = engine.create_mesh("m", MeshType::Cloud).unwrap();
    mesh.configure(&opts("t x", "t y")).unwrap();
    assert_eq!(mesh.num_triangles(), 1);
    assert_eq!(engine.tables().open_count("t"), Some(1));

    mesh.configure(&MeshOptions::new().x("").unwrap()).unwrap();
    assert_eq!(engine.tables().open_count("t"), Some(1));
    assert!(mesh.x_source().is_none());

    mesh.configure(&MeshOptions::new().y("1 2 3").unwrap()).unwrap();
    assert_eq!(engine.tables().open_count("t"), Some(0));
}

#[test]
fn deleted_column_clears_the_source() {
    let engine = engine();
    engine.tables().create_table("t").unwrap();
    let table = engine.tables().open("t").unwrap();
    let x = table.create_column("x");
    table.extend_rows(3);
    for (row, v) in [0.0, 1.0, 0.0].into_iter().enumerate() {
        table.set_double(row, x, v).unwrap();
    }
    let mesh = engine.create_mesh("m", MeshType::Cloud).unwrap();
    mesh.configure(&opts("t x", "0 0 1")).unwrap();
    assert_eq!(mesh.x_source().as_deref(), Some("t x"));
    let changes = watch(&mesh);

    table.delete_column(x).unwrap();
    assert!(mesh.x_source().is_none());
    assert!(mesh.is_config_pending());
    assert_eq!(engine.tables().open_count("t"), Some(1));

    // With one source missing the recompute is a no-op.
    assert!(engine.run_idle().is_empty());
    assert_eq!(changes.get(), 0);
    assert_eq!(mesh.num_vertices(), 3);
}

#[test]
fn destroyed_vector_clears_the_source() {
    let engine = engine();
    engine.vectors().create("ys", vec![0.0, 0.0, 1.0]).unwrap();
    let mesh = engine.create_mesh("m", MeshType::Cloud).unwrap();
    mesh.configure(&opts("0 1 0", "ys")).unwrap();
    assert_eq!(mesh.y_source().as_deref(), Some("ys"));

    engine.vectors().destroy("ys").unwrap();
    assert!(mesh.y_source().is_none());
    assert!(engine.run_idle().is_empty());
    assert_eq!(mesh.num_triangles(), 1);

    engine.vectors().create("ys", vec![0.0, 0.0, 2.0]).unwrap();
    mesh.configure(&MeshOptions::new().y("ys").unwrap()).unwrap();
    assert_relative_eq!(mesh.extents().unwrap().y_max, 2.0);
}

#[test]
fn handles_keep_a_destroyed_mesh_alive() {
    let engine = engine();
    let mesh = engine.create_mesh("m", MeshType::Cloud).unwrap();
    let other = engine.acquire("m").unwrap();
    assert!(mesh.ptr_eq(&other));
    assert_eq!(mesh.ref_count(), 3);
    let weak = mesh.downgrade();

    engine.destroy_mesh("m").unwrap();
    assert!(!weak.is_freed());
    drop(mesh);
    assert!(!weak.is_freed());
    assert!(other.is_deleted());
    drop(other);
    assert!(weak.is_freed());

    assert_eq!(engine.destroy_mesh("m"), Err(Error::NoSuchMesh("m".into())));
}

#[test]
fn snapshot_exports_current_geometry() {
    let engine = engine();
    let mesh = engine.create_mesh("grid", MeshType::Regular).unwrap();
    mesh.configure(&opts("0 2 3", "0 1 2")).unwrap();

    let snapshot = mesh.snapshot();
    assert_eq!(snapshot.mesh_type, "regular");
    assert_eq!(snapshot.vertices.len(), 6);
    assert_eq!(snapshot.triangles[0], [0, 1, 4]);
    let json = snapshot.to_json().unwrap();
    assert_eq!(MeshSnapshot::from_json(&json).unwrap(), snapshot);
}

#[test]
fn unknown_names_and_types() {
    let engine = engine();
    assert!(matches!(engine.acquire("nope"), Err(Error::NoSuchMesh(_))));
    assert_eq!(
        "hexagonal".parse::<MeshType>(),
        Err(Error::UnknownMeshType("hexagonal".into()))
    );
}
