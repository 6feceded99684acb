use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use mirra::prelude::*;

struct Point {
    x: i32,
    y: i32,
}

impl Describe for Point {
    fn describe(b: &mut TypeBuilder<'_, Self>) -> ReflectResult<()> {
        b.named("Point")
            .field("x", |p: &Point| &p.x, |p: &mut Point| &mut p.x)?
            .field("y", |p: &Point| &p.y, |p: &mut Point| &mut p.y)?
            .method1("move", ["dx"], |p: &mut Point, dx: i32| p.x += dx)?
            .const_method0("len2", |p: &Point| p.x * p.x + p.y * p.y)?;
        Ok(())
    }
}

fn bench_registry(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");

    group.bench_function("reflect_memoized", |b| {
        let mut registry = TypeRegistry::new();
        registry.reflect::<Point>().unwrap();
        b.iter(|| black_box(registry.reflect::<Point>().unwrap()));
    });

    group.bench_function("get_descriptor", |b| {
        let mut registry = TypeRegistry::new();
        let id = registry.reflect::<Point>().unwrap();
        b.iter(|| black_box(registry.get(black_box(id)).unwrap()));
    });

    group.bench_function("find_by_name", |b| {
        let mut registry = TypeRegistry::new();
        registry.reflect::<Point>().unwrap();
        b.iter(|| black_box(registry.find(black_box("Point"))));
    });

    group.finish();
}

fn bench_dynamic_access(c: &mut Criterion) {
    let mut group = c.benchmark_group("dynamic_access");

    group.bench_function("field_get", |b| {
        let mut registry = TypeRegistry::new();
        let info = registry.reflect_type::<Point>().unwrap();
        let point = Point { x: 3, y: 4 };
        let instance = Variant::borrowed(info.id(), &point);
        let field = info.field("x").unwrap();
        b.iter(|| black_box(field.get(&instance).unwrap()));
    });

    group.bench_function("field_set", |b| {
        let mut registry = TypeRegistry::new();
        let info = registry.reflect_type::<Point>().unwrap();
        let int = registry.reflect::<i32>().unwrap();
        let mut point = Point { x: 3, y: 4 };
        let mut instance = Variant::borrowed_mut(info.id(), &mut point);
        let field = info.field("x").unwrap();
        b.iter(|| {
            field
                .set(&mut instance, Variant::owned(int, black_box(5i32)))
                .unwrap()
        });
    });

    group.bench_function("invoke_method1", |b| {
        let mut registry = TypeRegistry::new();
        let info = registry.reflect_type::<Point>().unwrap();
        let int = registry.reflect::<i32>().unwrap();
        let mut point = Point { x: 0, y: 0 };
        let mut instance = Variant::borrowed_mut(info.id(), &mut point);
        let method = info.method("move").unwrap();
        b.iter(|| {
            let mut args = [Variant::owned(int, black_box(1i32))];
            black_box(method.invoke(&registry, &mut instance, &mut args).unwrap())
        });
    });

    group.bench_function("invoke_const_method0", |b| {
        let mut registry = TypeRegistry::new();
        let info = registry.reflect_type::<Point>().unwrap();
        let point = Point { x: 3, y: 4 };
        let mut instance = Variant::borrowed(info.id(), &point);
        let method = info.method("len2").unwrap();
        b.iter(|| black_box(method.invoke(&registry, &mut instance, &mut []).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_registry, bench_dynamic_access);
criterion_main!(benches);
