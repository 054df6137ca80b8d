//! Relocating a block of linked records with a raw byte copy.
//!
//! A `Scene` holds circles and rectangles chained through their common `Shape`
//! base. The whole block is copied bytewise to a fresh allocation and the
//! original is dropped; walking the copy still works because every link and
//! its target moved by the same amount.

use selfrel::{Bases, OffsetPtr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum Kind {
  Circle,
  Rect,
}

#[derive(Debug)]
#[repr(C)]
struct Shape {
  kind: Kind,
  next: OffsetPtr<Shape>,
}

impl Shape {
  const fn new(kind: Kind) -> Self {
    Self { kind, next: OffsetPtr::null() }
  }
}

#[derive(Bases, Debug)]
#[repr(C)]
struct Circle {
  radius: f64,
  #[base]
  shape: Shape,
}

#[derive(Bases, Debug)]
#[repr(C)]
struct Rect {
  w: f64,
  h: f64,
  #[base]
  shape: Shape,
}

#[derive(Debug)]
struct Scene {
  first: OffsetPtr<Shape>,
  circles: [Circle; 2],
  rects: [Rect; 2],
}

fn build() -> Box<Scene> {
  let mut scene = Box::new(Scene {
    first: OffsetPtr::null(),
    circles: [
      Circle { radius: 1.0, shape: Shape::new(Kind::Circle) },
      Circle { radius: 2.0, shape: Shape::new(Kind::Circle) },
    ],
    rects: [
      Rect { w: 2.0, h: 3.0, shape: Shape::new(Kind::Rect) },
      Rect { w: 4.0, h: 0.5, shape: Shape::new(Kind::Rect) },
    ],
  });

  // Chain circle 0 -> rect 0 -> circle 1 -> rect 1. Each `set` upcasts the
  // derived address to its `Shape` field.
  let s = &mut *scene;
  s.first.set(&raw mut s.circles[0]);
  s.circles[0].shape.next.set(&raw mut s.rects[0]);
  s.rects[0].shape.next.set(&raw mut s.circles[1]);
  s.circles[1].shape.next.set(&raw mut s.rects[1]);
  scene
}

fn describe(scene: &Scene) -> (Vec<String>, f64) {
  let mut names = Vec::new();
  let mut area = 0.0;
  let mut link = &scene.first;
  while !link.is_null() {
    // SAFETY: every link in a scene targets a `Shape` field inside it.
    let shape = unsafe { &*link.get() };
    match shape.kind {
      Kind::Circle => {
        // SAFETY: a `Circle` kind tag is only set on the base of a `Circle`.
        let c = unsafe { &*link.downcast::<Circle>() };
        names.push(format!("circle r={}", c.radius));
        area += std::f64::consts::PI * c.radius * c.radius;
      }
      Kind::Rect => {
        // SAFETY: a `Rect` kind tag is only set on the base of a `Rect`.
        let r = unsafe { &*link.downcast::<Rect>() };
        names.push(format!("rect {}x{}", r.w, r.h));
        area += r.w * r.h;
      }
    }
    link = &shape.next;
  }
  (names, area)
}

fn main() {
  let scene = build();
  let (before, area_before) = describe(&scene);
  println!("original at {:p}: {before:?}", &raw const *scene);

  let mut moved = Box::<Scene>::new_uninit();
  // SAFETY: `Scene` holds no owning pointers, so a bytewise copy is a valid
  // `Scene`, and the offsets inside stay consistent with each other.
  let moved = unsafe {
    core::ptr::copy_nonoverlapping(&raw const *scene, moved.as_mut_ptr(), 1);
    moved.assume_init()
  };
  // Links resolve through exposed provenance; expose the new allocation.
  let _ = (&raw const *moved).expose_provenance();
  drop(scene);

  let (after, area_after) = describe(&moved);
  println!("copy at {:p}:     {after:?}", &raw const *moved);
  assert_eq!(before, after);
  assert!((area_before - area_after).abs() < f64::EPSILON);
  println!("total area {area_after:.3}");
}
