#![cfg(feature = "derive")]

use core::ptr;

use selfrel::{Bases, OffsetError, OffsetPtr, RawOffsetPtr, Subobject};

const TEST_INT: i32 = 10;
const TEST_ARR_SIZE: usize = 10;

#[derive(Debug)]
#[repr(C)]
struct Foo {
  bar: i32,
  arr: [u8; TEST_ARR_SIZE],
}

#[derive(Debug, PartialEq)]
#[repr(C)]
#[expect(dead_code, reason = "only compared through derived impls")]
struct A {
  a: u64,
}

#[derive(Debug, PartialEq)]
#[repr(C)]
#[expect(dead_code, reason = "only compared through derived impls")]
struct B {
  b: u64,
}

#[derive(Bases, Debug)]
#[repr(C)]
struct C {
  #[base]
  a: A,
  #[base]
  b: B,
  c: u64,
}

fn test_array() -> [i32; TEST_ARR_SIZE] {
  core::array::from_fn(|i| i as i32)
}

fn assert_null(p: &OffsetPtr<i32>) {
  assert!(p.is_null());
  assert!(p.get().is_null());
  assert_eq!(*p, ptr::null_mut::<i32>());
  assert_eq!(p.offset(), 0);
}

// ===========================================================================
// Null handling
// ===========================================================================

#[test]
fn null_constructors_agree() {
  let default = OffsetPtr::<i32>::default();
  let explicit = OffsetPtr::<i32>::null();
  assert_null(&default);
  assert_null(&explicit);
  assert_eq!(default, explicit);

  let mut copy = OffsetPtr::<i32>::null();
  copy.set(&explicit);
  assert_null(&copy);

  let mut x = 5;
  let mut from_raw = OffsetPtr::<i32>::null();
  from_raw.set(&raw mut x);
  from_raw.set(ptr::null_mut::<i32>());
  assert_null(&from_raw);
}

#[test]
fn null_swap() {
  let mut a = OffsetPtr::<i32>::null();
  let mut b = OffsetPtr::<i32>::null();
  a.swap(&mut b);
  assert_null(&a);
  assert_null(&b);
}

#[test]
fn raw_pointer_roundtrip() {
  let mut values = test_array();
  let mut p = OffsetPtr::<i32>::null();
  for i in 0..TEST_ARR_SIZE {
    let addr = &raw mut values[i];
    p.set(addr);
    assert_eq!(p.get(), addr);
    assert!(!p.is_null());
    assert_ne!(p, ptr::null_mut::<i32>());
  }
}

#[test]
fn own_slot_is_a_valid_target() {
  let mut p = OffsetPtr::<u64>::null();
  let slot = (&raw mut p).cast::<u64>();
  p.set(slot);
  assert!(!p.is_null());
  assert_eq!(p.get(), slot);
}

#[test]
fn inside_slot_is_rejected() {
  let mut p = OffsetPtr::<u8>::null();
  let inside = (&raw mut p).cast::<u8>().wrapping_add(1);
  assert_eq!(
    p.try_set(inside),
    Err(OffsetError::InsideSlot { slot: (&raw const p).addr() })
  );
  assert!(p.is_null());
}

#[test]
#[should_panic(expected = "cannot target the inside of its own slot")]
fn inside_slot_panics_on_set() {
  let mut p = OffsetPtr::<u8>::null();
  let inside = (&raw mut p).cast::<u8>().wrapping_add(1);
  p.set(inside);
}

// ===========================================================================
// Relocation
// ===========================================================================

#[test]
fn copy_reencodes_against_destination() {
  let mut x = 42u64;
  let mut slots: [OffsetPtr<u64>; 4] = Default::default();
  slots[0].set(&mut x);

  for i in 1..slots.len() {
    let (done, rest) = slots.split_at_mut(i);
    rest[0].set(&done[i - 1]);
    assert_eq!(rest[0].get(), &raw mut x);
    assert_ne!(rest[0].offset(), done[i - 1].offset());
  }
  assert!(slots.iter().all(|p| *p == slots[0]));
}

#[test]
fn byte_copy_to_new_slot_is_wrong() {
  let mut x = 1u32;
  let mut a = OffsetPtr::<u32>::null();
  a.set(&mut x);

  let mut b = OffsetPtr::<u32>::null();
  // SAFETY: both slots are valid `OffsetPtr<u32>`; this copies the raw bits.
  unsafe { ptr::copy_nonoverlapping(&raw const a, &raw mut b, 1) };
  assert_eq!(b.offset(), a.offset());
  assert_ne!(b.get(), &raw mut x);

  b.set(&a);
  assert_eq!(b.get(), &raw mut x);
}

#[repr(C)]
struct Block {
  head: OffsetPtr<Node>,
  nodes: [Node; 3],
}

#[repr(C)]
struct Node {
  value: u32,
  next: OffsetPtr<Node>,
}

#[test]
fn relocating_the_whole_block_keeps_links() {
  let mut src = Block {
    head: OffsetPtr::null(),
    nodes: [
      Node { value: 1, next: OffsetPtr::null() },
      Node { value: 2, next: OffsetPtr::null() },
      Node { value: 3, next: OffsetPtr::null() },
    ],
  };
  let [n0, n1, n2] = src.nodes.each_mut().map(ptr::from_mut);
  src.head.set(n0);
  // SAFETY: `n0` and `n1` address live elements of `src.nodes`.
  unsafe {
    (*n0).next.set(n1);
    (*n1).next.set(n2);
  }

  // Different base address: a heap block instead of the stack.
  let mut dst = Box::new(core::mem::MaybeUninit::<Block>::uninit());
  // A fresh mapping: expose it so resolves can recover its provenance.
  let _ = dst.as_mut_ptr().expose_provenance();
  // SAFETY: `Block` holds only integers, so a byte copy is a valid value.
  let dst = unsafe {
    ptr::copy_nonoverlapping(&raw const src, dst.as_mut_ptr(), 1);
    dst.assume_init_mut()
  };
  assert_ne!(ptr::from_ref(dst).addr(), ptr::from_ref(&src).addr());

  let mut seen = Vec::new();
  let mut cur = dst.head.get();
  while !cur.is_null() {
    assert!(dst.nodes.as_ptr_range().contains(&cur.cast_const()));
    // SAFETY: `cur` is one of `dst.nodes`.
    let node = unsafe { &*cur };
    seen.push(node.value);
    cur = node.next.get();
  }
  assert_eq!(seen, [1, 2, 3]);
}

// ===========================================================================
// Arithmetic
// ===========================================================================

#[test]
fn increment_and_decrement() {
  let mut arr = test_array();
  let mut p = OffsetPtr::<i32>::null();
  p.set(&raw mut arr[0]);

  // SAFETY (all derefs below): `p` stays within `arr`.
  for i in 0..TEST_ARR_SIZE as i32 {
    assert_eq!(unsafe { *p.get() }, i);
    p.post_inc();
  }
  for i in (1..=TEST_ARR_SIZE as i32).rev() {
    p.post_dec();
    assert_eq!(unsafe { *p.get() }, i - 1);
  }
  for i in 0..TEST_ARR_SIZE as i32 {
    assert_eq!(unsafe { *p.get() }, i);
    p.inc();
  }
  for i in (1..=TEST_ARR_SIZE as i32).rev() {
    p.dec();
    assert_eq!(unsafe { *p.get() }, i - 1);
  }
  assert_eq!(p.get(), &raw mut arr[0]);
}

#[repr(C)]
struct Cursor {
  arr: [u64; TEST_ARR_SIZE],
  cur: OffsetPtr<u64>,
}

#[test]
fn one_past_end_can_be_the_slot_itself() {
  let mut c = Cursor { arr: core::array::from_fn(|i| i as u64), cur: OffsetPtr::null() };
  let begin = (&raw mut c.arr).cast::<u64>();
  let end = begin.wrapping_add(TEST_ARR_SIZE);
  assert_eq!(end.addr(), (&raw const c.cur).addr());

  c.cur.set(begin);
  let mut sum = 0;
  while c.cur != end {
    // SAFETY: `cur` is within `arr` until it reaches `end`.
    sum += unsafe { *c.cur.post_inc() };
  }
  assert_eq!(sum, (0..TEST_ARR_SIZE as u64).sum::<u64>());
  assert!(!c.cur.is_null());
  assert_eq!(c.cur.get(), end);
  assert_eq!(c.cur.get().addr() - begin.addr(), size_of::<[u64; TEST_ARR_SIZE]>());

  c.cur -= TEST_ARR_SIZE as isize;
  assert_eq!(c.cur.get(), begin);
  c.cur += TEST_ARR_SIZE as isize;
  assert_eq!(c.cur.get(), end);

  let mut copy = OffsetPtr::<u64>::null();
  copy.set(&c.cur);
  assert_eq!(copy.get(), end);
}

#[test]
fn post_increment_returns_previous() {
  let mut arr = test_array();
  let mut p = OffsetPtr::<i32>::null();
  p.set(&raw mut arr[3]);
  assert_eq!(p.post_inc(), &raw mut arr[3]);
  assert_eq!(p.get(), &raw mut arr[4]);
  assert_eq!(p.post_dec(), &raw mut arr[4]);
  assert_eq!(p.get(), &raw mut arr[3]);
  assert_eq!(p.inc().dec().get(), &raw mut arr[3]);
}

#[test]
fn compound_assignment() {
  let mut arr = test_array();
  let mut p = OffsetPtr::<i32>::null();
  p.set(&raw mut arr[0]);

  p += 2;
  // SAFETY: `p` points into `arr`.
  assert_eq!(unsafe { *p.get() }, 2);
  p -= 2;
  // SAFETY: `p` points into `arr`.
  assert_eq!(unsafe { *p.get() }, 0);
}

#[test]
fn add_sub_and_one_past_end() {
  let mut arr = test_array();
  let mut begin = OffsetPtr::<i32>::null();
  begin.set(&raw mut arr[0]);

  for i in 0..TEST_ARR_SIZE as isize {
    // SAFETY: `begin + i` is within `arr`.
    assert_eq!(unsafe { *(&begin + i) }, i as i32);
    assert_eq!((&begin + i).addr(), begin.get().addr() + i as usize * size_of::<i32>());
  }

  let mut end = OffsetPtr::<i32>::null();
  end.set(&begin + TEST_ARR_SIZE as isize);
  for i in (1..=TEST_ARR_SIZE as isize).rev() {
    // SAFETY: `end - i` is within `arr`.
    assert_eq!(unsafe { *(&end - i) }, (TEST_ARR_SIZE as isize - i) as i32);
  }

  assert_eq!(&end - &begin, TEST_ARR_SIZE as isize);
  assert_eq!(&begin - &end, -(TEST_ARR_SIZE as isize));
  assert_eq!(end.offset_from(&begin), TEST_ARR_SIZE as isize);
}

#[test]
fn distance_is_in_elements_not_bytes() {
  let mut arr = [[0u8; 24]; 4];
  let mut a = OffsetPtr::<[u8; 24]>::null();
  let mut b = OffsetPtr::<[u8; 24]>::null();
  a.set(&raw mut arr[0]);
  b.set(&raw mut arr[3]);
  assert_eq!(&b - &a, 3);
  assert_eq!(RawOffsetPtr::distance_between(a.as_raw(), b.as_raw()), 72);
}

#[test]
fn arithmetic_moves_only_the_target() {
  let mut arr = test_array();
  let mut p = OffsetPtr::<i32>::null();
  p.set(&raw mut arr[0]);
  let before = p.offset();
  p += 3;
  assert_eq!(p.offset(), before + 3 * size_of::<i32>() as isize);
}

// ===========================================================================
// Comparisons
// ===========================================================================

#[test]
fn relational_operators() {
  let mut arr = test_array();
  let mut first = OffsetPtr::<i32>::null();
  let mut last = OffsetPtr::<i32>::null();
  first.set(&raw mut arr[0]);
  last.set(&first + (TEST_ARR_SIZE as isize - 1));
  let mut same = OffsetPtr::<i32>::null();
  same.set(&first);

  assert!(first != last);
  assert!(first <= last);
  assert!(first < last);
  assert!(last > first);
  assert!(last >= first);
  assert!(first == same);
  assert!(first >= same);
  assert!(first <= same);
}

#[test]
fn null_comparisons() {
  let mut arr = test_array();
  let mut first = OffsetPtr::<i32>::null();
  first.set(&raw mut arr[0]);
  let null = ptr::null_mut::<i32>();

  assert!(first != null);
  assert!(null != first);
  assert!(!(first == null));
  assert!(!(null == first));

  assert!(null < first);
  assert!(!(first < null));
  assert!(null <= first);
  assert!(!(first <= null));

  assert!(first > null);
  assert!(!(null > first));
  assert!(first >= null);
  assert!(!(null >= first));

  let parray = OffsetPtr::<[[i32; 12]; 10]>::null();
  let null = ptr::null_mut::<[[i32; 12]; 10]>();
  assert!(parray == null);
  assert!(null == parray);
  assert!(!(parray < null));
  assert!(!(null < parray));
  assert!(parray <= null);
  assert!(null <= parray);
  assert!(!(parray > null));
  assert!(parray >= null);
}

#[test]
fn order_follows_resolved_address_not_offset() {
  let mut arr = test_array();
  // Two slots at different addresses: `hi` resolves higher but, being
  // further along, can store a smaller offset.
  let mut slots: [OffsetPtr<i32>; 2] = Default::default();
  let (lo_slot, hi_slot) = slots.split_at_mut(1);
  lo_slot[0].set(&raw mut arr[0]);
  hi_slot[0].set(&raw mut arr[1]);

  assert!(lo_slot[0] < hi_slot[0]);
  assert_eq!(lo_slot[0].cmp(&hi_slot[0]), core::cmp::Ordering::Less);
}

#[test]
fn hash_by_address() {
  use std::collections::HashSet;

  let mut x = 0u8;
  let mut a = OffsetPtr::<u8>::null();
  let mut b = OffsetPtr::<u8>::null();
  a.set(&raw mut x);
  b.set(&a);

  let mut set = HashSet::new();
  set.insert(&a);
  assert!(set.contains(&b));
  assert_ne!(a.offset(), b.offset());
}

#[test]
fn pointer_formatting_prints_address() {
  let mut x = 0u8;
  let mut p = OffsetPtr::<u8>::null();
  p.set(&raw mut x);
  assert_eq!(format!("{p:p}"), format!("{:p}", &raw mut x));
  assert_eq!(format!("{p:?}"), format!("{:p}", &raw mut x));
}

// ===========================================================================
// Hierarchy casts
// ===========================================================================

#[test]
fn upcast_through_assignment() {
  let mut c = C { a: A { a: 1 }, b: B { b: 2 }, c: 3 };
  let mut cptr = OffsetPtr::<C>::null();
  cptr.set(&mut c);

  let mut bptr = OffsetPtr::<B>::null();
  bptr.set(&cptr);
  let distance = RawOffsetPtr::distance_between(cptr.as_raw(), bptr.as_raw());
  assert!(distance > 0);
  assert_eq!(distance.cast_unsigned(), size_of::<A>());
  // SAFETY: `bptr` points at `c.b`.
  assert_eq!(unsafe { bptr.as_ref() }, Some(&B { b: 2 }));

  let mut aptr = OffsetPtr::<A>::null();
  aptr.set(&cptr);
  assert_eq!(RawOffsetPtr::distance_between(cptr.as_raw(), aptr.as_raw()), 0);
  assert_eq!(c.c, 3);
}

#[test]
fn explicit_upcast() {
  let mut c = C { a: A { a: 1 }, b: B { b: 2 }, c: 3 };
  let mut cptr = OffsetPtr::<C>::null();
  cptr.set(&mut c);

  let b = cptr.upcast::<B>();
  assert_eq!(b, &raw mut c.b);
  assert_eq!(b.addr() - (&raw mut c).addr(), size_of::<A>());

  let mut bptr = OffsetPtr::<B>::null();
  bptr.set(b);
  // SAFETY: `bptr` points at the `B` subobject of `c`.
  let back = unsafe { bptr.downcast::<C>() };
  assert_eq!(back, &raw mut c);
}

#[test]
fn upcast_from_raw_pointer() {
  let mut c = C { a: A { a: 1 }, b: B { b: 2 }, c: 3 };
  let mut bptr = OffsetPtr::<B>::null();
  bptr.set(&raw mut c);
  assert_eq!(bptr.get(), &raw mut c.b);
}

#[test]
fn upcast_null_stays_null() {
  let cptr = OffsetPtr::<C>::null();
  let mut bptr = OffsetPtr::<B>::null();
  bptr.set(&cptr);
  assert!(bptr.is_null());
  assert!(cptr.upcast::<B>().is_null());
}

#[test]
fn displacement_is_a_layout_query() {
  assert_eq!(<C as Subobject<A>>::displacement(), core::mem::offset_of!(C, a));
  assert_eq!(<C as Subobject<B>>::displacement(), core::mem::offset_of!(C, b));
  assert_eq!(<C as Subobject<B>>::displacement(), size_of::<A>());
}

#[derive(Bases)]
#[expect(dead_code, reason = "fields are reached through upcasts")]
struct Pair(#[base] u16, #[base] u64);

#[derive(Bases)]
#[repr(C)]
struct Tagged<T> {
  tag: u32,
  #[base]
  inner: Wrapped<T>,
}

#[repr(C)]
#[expect(dead_code, reason = "payload is never read back")]
struct Wrapped<T>(T);

#[test]
fn derive_tuple_and_generic_structs() {
  let mut pair = Pair(1, 2);
  let mut p = OffsetPtr::<u64>::null();
  p.set(&raw mut pair);
  assert_eq!(p.get(), &raw mut pair.1);

  let mut t = Tagged { tag: 9, inner: Wrapped(7u8) };
  let mut w = OffsetPtr::<Wrapped<u8>>::null();
  w.set(&mut t);
  assert_eq!(w.get(), &raw mut t.inner);
  assert_eq!(<Tagged<u8> as Subobject<Wrapped<u8>>>::displacement(), 4);
  assert_eq!(t.tag, 9);
}

// ===========================================================================
// Type-erased storage
// ===========================================================================

#[test]
fn base_pointer_array() {
  let mut f = Foo { bar: 1, arr: [0; TEST_ARR_SIZE] };
  let mut test_int = TEST_INT;

  let mut typed_foo = OffsetPtr::<Foo>::null();
  let mut typed_int = OffsetPtr::<i32>::null();
  typed_foo.set(&mut f);
  typed_int.set(&mut test_int);

  let mut arr: [RawOffsetPtr; 3] = Default::default();
  arr[0].assign(typed_foo.as_raw());
  arr[1].assign(typed_int.as_raw());
  arr[2].set_null();

  assert!(!arr[0].to_void_ptr().is_null());
  // SAFETY: `arr[1]` points at `test_int`.
  assert_eq!(unsafe { *arr[1].to_void_ptr().cast::<i32>() }, TEST_INT);
  assert!(arr[2].to_void_ptr().is_null());
  assert!(arr[2].is_null());

  let mut tmp0 = OffsetPtr::<Foo>::null();
  let mut tmp1 = OffsetPtr::<i32>::null();
  let mut tmp2 = OffsetPtr::<Foo>::null();
  tmp0.set(arr[0].to_void_ptr().cast::<Foo>());
  tmp1.set(arr[1].to_void_ptr().cast::<i32>());
  tmp2.set(arr[2].to_void_ptr().cast::<Foo>());
  assert_eq!(tmp0.get(), &raw mut f);
  assert_eq!(tmp1.get(), &raw mut test_int);
  assert!(tmp2.is_null());

  // In-place typed view of an erased slot.
  // SAFETY: `arr[0]` points at `f`.
  assert_eq!(unsafe { arr[0].cast::<Foo>().as_ref() }.map(|foo| foo.bar), Some(1));
  assert_eq!(f.arr, [0; TEST_ARR_SIZE]);
}

#[test]
fn base_pointer_assignment() {
  let mut tmp = 0i32;
  let mut ptr1 = RawOffsetPtr::null();
  let ptr2 = RawOffsetPtr::null();
  ptr1.set_raw((&raw mut tmp).cast());

  ptr1.assign(&ptr2);
  assert!(ptr1.to_void_ptr().is_null());
  assert!(ptr2.to_void_ptr().is_null());
  assert_eq!(ptr1, ptr2);
}

#[test]
fn base_pointer_swap_reencodes() {
  let mut x = 1u8;
  let mut y = 2u8;
  let mut slots: [RawOffsetPtr; 2] = Default::default();
  let (a, b) = slots.split_at_mut(1);
  a[0].set_raw(&raw mut x);
  b[0].set_raw(&raw mut y);

  a[0].swap(&mut b[0]);
  assert_eq!(a[0].to_byte_ptr(), &raw mut y);
  assert_eq!(b[0].to_byte_ptr(), &raw mut x);
}

#[test]
fn typed_swap_exchanges_targets() {
  let mut x = 1u8;
  let mut p = OffsetPtr::<u8>::null();
  let mut q = OffsetPtr::<u8>::null();
  p.set(&raw mut x);

  p.swap(&mut q);
  assert!(p.is_null());
  assert_eq!(q.get(), &raw mut x);
}
