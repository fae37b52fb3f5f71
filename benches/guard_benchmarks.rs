use criterion::{criterion_group, criterion_main, Criterion};
use marketdesk::auth::{decide, Role, Session, User, UserId};
use marketdesk::RouteTable;
use std::hint::black_box;

fn session_with(role: Role) -> Session {
    Session::authenticated(User::new(UserId::Number(1), role), "token".to_string())
}

fn bench_decide(c: &mut Criterion) {
    let admin = session_with(Role::Admin);
    let none: [&str; 0] = [];

    c.bench_function("decide_any_role", |b| {
        b.iter(|| decide(black_box(&admin), black_box(&none)))
    });

    c.bench_function("decide_role_match", |b| {
        b.iter(|| decide(black_box(&admin), black_box(&[" Provider ", "ADMIN"])))
    });

    c.bench_function("decide_role_mismatch", |b| {
        b.iter(|| decide(black_box(&admin), black_box(&["customer", "superadmin"])))
    });
}

fn bench_route_table(c: &mut Criterion) {
    let table = RouteTable::default();
    let customer = session_with(Role::Customer);

    c.bench_function("route_table_decide", |b| {
        b.iter(|| table.decide(black_box("/admin/users/"), black_box(&customer)))
    });
}

criterion_group!(benches, bench_decide, bench_route_table);
criterion_main!(benches);
