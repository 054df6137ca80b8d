//! Lock-free stack shared between threads.
//!
//! The head is an `AtomicOffsetPtr` and each node links to the next with an
//! `OffsetPtr`. Pushes race on a weak compare-exchange; the final pass pops
//! everything single-threaded and checks that no value was lost.

use std::{
  sync::atomic::Ordering::{Acquire, Relaxed, Release},
  thread,
};

use selfrel::{AtomicOffsetPtr, OffsetPtr};

const THREADS: usize = 8;
const PER_THREAD: usize = 10_000;

struct Node {
  value: usize,
  next: OffsetPtr<Node>,
}

#[derive(Debug, Default)]
struct Stack {
  head: AtomicOffsetPtr<Node>,
}

impl Stack {
  fn push(&self, value: usize) {
    let node = Box::into_raw(Box::new(Node { value, next: OffsetPtr::null() }));
    let mut head = self.head.load(Relaxed);
    loop {
      // SAFETY: `node` is not published yet; this thread owns it.
      unsafe { (*node).next.set(head) };
      match self.head.compare_exchange_weak(head, node, Release, Relaxed) {
        Ok(_) => return,
        Err(actual) => head = actual,
      }
    }
  }

  /// Pop one node. Requires exclusive access, so there is no ABA hazard.
  fn pop(&mut self) -> Option<usize> {
    let head = self.head.get_mut();
    let top = head.get();
    if top.is_null() {
      return None;
    }
    // SAFETY: `top` was allocated by `push` and is unreachable once unlinked.
    let node = unsafe { Box::from_raw(top) };
    head.set(&node.next);
    Some(node.value)
  }
}

impl Drop for Stack {
  fn drop(&mut self) {
    while self.pop().is_some() {}
  }
}

fn main() {
  let mut stack = Stack::default();

  thread::scope(|s| {
    for t in 0..THREADS {
      let stack = &stack;
      s.spawn(move || {
        for i in 0..PER_THREAD {
          stack.push(t * PER_THREAD + i);
        }
      });
    }
  });

  let top = stack.head.load(Acquire);
  // SAFETY: all pushes have joined; `top` is a live node.
  println!("top of stack: {}", unsafe { (*top).value });

  let mut seen = vec![false; THREADS * PER_THREAD];
  while let Some(value) = stack.pop() {
    assert!(!seen[value], "value {value} popped twice");
    seen[value] = true;
  }
  assert!(seen.iter().all(|&s| s));
  println!("popped {} values from {THREADS} producers", seen.len());
}
